use soroban_sdk::{contracttype, Address, String};

#[contracttype]
#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub enum AgreementStatus {
    Pending = 0,
    Signed = 1,
    Completed = 2,
    Terminated = 3,
}

impl AgreementStatus {
    pub fn is_terminal(&self) -> bool {
        matches!(self, AgreementStatus::Completed | AgreementStatus::Terminated)
    }
}

#[contracttype]
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct Agreement {
    pub id: u64,
    pub property_id: String,
    pub landlord: Address,
    pub tenant: Address,
    pub monthly_rent: i128,
    pub security_deposit: i128,
    pub lease_duration: u64, // seconds
    pub contract_terms: String,
    pub status: AgreementStatus,
    pub security_deposit_paid: bool,
    pub deposit_held: i128, // net of signing fee; zero once refunded
    pub start_date: u64,
    pub end_date: u64,
    pub created_at: u64,
    pub rent_payments: u32,
    pub total_rent_paid: i128,
    pub last_paid_period: u32, // YYYYMM of the latest rent payment, 0 if none
}

impl Agreement {
    pub fn is_party(&self, who: &Address) -> bool {
        *who == self.landlord || *who == self.tenant
    }
}

#[contracttype]
#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub enum AuditKind {
    Created,
    Signed,
    DepositPaid,
    RentPaid,
    Terminated,
    Completed,
    DepositReturned,
}

/// One entry in an agreement's append-only history. Entries mirror the
/// published events in the same order.
#[contracttype]
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct AuditRecord {
    pub kind: AuditKind,
    pub actor: Address,
    pub amount: i128,
    pub timestamp: u64,
}

#[contracttype]
#[derive(Clone, Debug, Eq, PartialEq)]
pub enum DataKey {
    Owner,
    PendingOwner,
    TransferExpiry,
    Token,
    PlatformAccount,
    FeeRate,
    AgreementCounter,
    Agreement(u64),              // agreement_id -> Agreement
    LandlordAgreements(Address), // landlord -> Vec<agreement_id>
    TenantAgreements(Address),   // tenant -> Vec<agreement_id>
    History(u64),                // agreement_id -> Vec<AuditRecord>
    Lock(u64),                   // per-agreement reentrancy lock
}
