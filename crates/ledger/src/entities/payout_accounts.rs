//! `SeaORM` Entity for the payout_accounts table.

use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Eq, Serialize, Deserialize)]
#[sea_orm(table_name = "payout_accounts")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: Uuid,
    pub usertag: String,
    /// Holder name as resolved by the provider.
    pub account_name: String,
    pub account_number: String,
    pub bank_code: String,
    pub bank_name: String,
    /// Provider recipient code used to initiate transfers.
    pub recipient_code: String,
    /// Soft-deactivated accounts keep the audit trail for past payouts.
    pub is_active: bool,
    pub created_at: DateTimeWithTimeZone,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {}

impl ActiveModelBehavior for ActiveModel {}
