//! # Party Creation
//!
//! A party's opening balance is not a separate field added on top of the
//! ledger: it becomes the party's first entry, so the cached balance is
//! always the signed sum of entries.
//!
//! ```text
//! receivable 500 → DEBIT  500  source=opening   balance  500
//! payable    500 → CREDIT 500  source=opening   balance −500
//! ```

use chrono::Utc;
use tracing::info;
use uuid::Uuid;

use super::{Orchestrator, PartyPosting};
use crate::error::DbResult;
use tradebook_core::requests::CreatePartyRequest;
use tradebook_core::{Actor, CoreError, EntrySource, Money, Party};

impl Orchestrator {
    pub async fn create_party(&self, actor: &Actor, request: &CreatePartyRequest) -> DbResult<Party> {
        request.validate().map_err(CoreError::from)?;

        let now = Utc::now();
        let mut party = Party {
            id: Uuid::new_v4().to_string(),
            kind: request.kind,
            name: request.name.trim().to_string(),
            phone: request.phone.clone(),
            email: request.email.clone(),
            opening_balance_cents: request.opening_balance_cents,
            balance_type: request.balance_type,
            current_balance_cents: 0,
            created_at: now,
            updated_at: now,
        };

        let mut tx = self.db.begin_write().await?;

        self.db.parties().insert_in(&mut tx, &party).await?;

        let opening = Money::from_cents(request.opening_balance_cents);
        let entry_type = request.balance_type.opening_entry_type();
        self.post_party(
            &mut tx,
            PartyPosting {
                party_id: &party.id,
                entry_type,
                amount: opening,
                description: "Opening balance".to_string(),
                source: EntrySource::Opening,
                payment_id: None,
                transaction_id: None,
                actor,
            },
        )
        .await?;

        tx.commit().await?;

        party.current_balance_cents = entry_type.signed(opening).cents();
        info!(
            party_id = %party.id,
            kind = party.kind.as_str(),
            opening = opening.cents(),
            "Party created"
        );

        Ok(party)
    }
}

#[cfg(test)]
mod tests {
    use super::super::test_support::{party_request, Fixture};
    use tradebook_core::{BalanceType, EntrySource, PartyKind};

    #[tokio::test]
    async fn test_opening_balance_is_first_entry() {
        let fx = Fixture::new().await;
        let mut request = party_request(PartyKind::Supplier, "Old Supplier");
        request.opening_balance_cents = 12_500;
        request.balance_type = BalanceType::Payable;

        let party = fx
            .orchestrator
            .create_party(&fx.manager, &request)
            .await
            .unwrap();

        assert_eq!(party.current_balance_cents, -12_500);
        assert_eq!(fx.balance(&party.id).await, -12_500);

        let entries = fx.db.party_ledger().entries(&party.id).await.unwrap();
        assert_eq!(entries.len(), 1);
        assert_eq!(entries[0].source, EntrySource::Opening);
        assert_eq!(entries[0].running_balance_cents, -12_500);
    }

    #[tokio::test]
    async fn test_zero_opening_balance_appends_nothing() {
        let fx = Fixture::new().await;
        let entries = fx.db.party_ledger().entries(&fx.customer.id).await.unwrap();
        assert!(entries.is_empty());
        assert_eq!(fx.customer.current_balance_cents, 0);
    }

    #[tokio::test]
    async fn test_blank_name_rejected() {
        let fx = Fixture::new().await;
        let err = fx
            .orchestrator
            .create_party(&fx.manager, &party_request(PartyKind::Customer, "   "))
            .await
            .unwrap_err();
        assert!(err.as_domain().is_some());
    }
}
