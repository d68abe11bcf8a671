//! `SeaORM` Entity for the wallet_transactions table.

use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

use super::sea_orm_active_enums::{TransactionDirection, TransactionPurpose, TransactionStatus};

#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Eq, Serialize, Deserialize)]
#[sea_orm(table_name = "wallet_transactions")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: Uuid,
    pub usertag: String,
    /// Amount in minor units (kobo), always positive.
    pub amount: i64,
    pub direction: TransactionDirection,
    pub purpose: TransactionPurpose,
    /// Provider-facing reference, globally unique.
    #[sea_orm(unique)]
    pub reference: String,
    /// Provider-assigned reference, set after charge initialization.
    pub provider_reference: Option<String>,
    /// Provider checkout access code, set after charge initialization.
    pub access_code: Option<String>,
    /// Provider transfer code, set after transfer initiation.
    pub transfer_code: Option<String>,
    pub status: TransactionStatus,
    /// Caller-supplied note (service payments).
    pub memo: Option<String>,
    pub created_at: DateTimeWithTimeZone,
    pub updated_at: DateTimeWithTimeZone,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(
        belongs_to = "super::wallets::Entity",
        from = "Column::Usertag",
        to = "super::wallets::Column::Usertag"
    )]
    Wallets,
}

impl Related<super::wallets::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Wallets.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}
