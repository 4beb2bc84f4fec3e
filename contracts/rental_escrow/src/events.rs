use soroban_sdk::{contractevent, Address, String};

// admin events
#[contractevent]
pub struct OwnershipTransferInitiated {
    pub new_owner: Address,
}

#[contractevent]
pub struct OwnershipTransferred {
    pub new_owner: Address,
}

#[contractevent]
pub struct PlatformFeeRateUpdated {
    pub old_rate: u32,
    pub new_rate: u32,
}

#[contractevent]
pub struct PlatformAccountUpdated {
    pub account: Address,
}

// agreement lifecycle events
#[contractevent]
pub struct ContractCreated {
    #[topic]
    pub agreement_id: u64,
    pub property_id: String,
    pub landlord: Address,
    pub tenant: Address,
}

#[contractevent]
pub struct ContractSigned {
    #[topic]
    pub agreement_id: u64,
    pub tenant: Address,
}

#[contractevent]
pub struct ContractTerminated {
    #[topic]
    pub agreement_id: u64,
    pub terminated_by: Address,
}

#[contractevent]
pub struct ContractCompleted {
    #[topic]
    pub agreement_id: u64,
    pub completed_by: Address,
}

// fund movement events
#[contractevent]
pub struct SecurityDepositPaid {
    #[topic]
    pub agreement_id: u64,
    pub amount: i128,
}

#[contractevent]
pub struct RentPaid {
    #[topic]
    pub agreement_id: u64,
    pub net_amount: i128,
    pub payment_number: u32,
    pub period: u32, // YYYYMM
}

#[contractevent]
pub struct SecurityDepositReturned {
    #[topic]
    pub agreement_id: u64,
    pub amount: i128,
}
