use soroban_sdk::contracterror;

#[contracterror]
#[derive(Copy, Clone, Debug, Eq, PartialEq, PartialOrd, Ord)]
#[repr(u32)]
pub enum Error {
    // Authorization errors
    Unauthorized = 1,
    OwnerNotSet = 2,

    // Lifecycle errors
    NotFound = 10,
    WrongState = 11,
    LeaseNotEnded = 12,

    // Agreement validation errors
    InvalidTenant = 20,
    InvalidRent = 21,
    InvalidDeposit = 22,
    InvalidLeaseDuration = 23,

    // Payment errors
    InsufficientDeposit = 30,
    InsufficientRent = 31,

    // Ownership transfer errors
    NoPendingOwnershipTransfer = 40,
    OwnershipTransferExpired = 41,
    PendingOwnershipTransferExists = 42,

    // Configuration errors
    FeeTooHigh = 50,
    PlatformAccountNotSet = 51,
    TokenNotSet = 52,
    FeeRateNotSet = 53,
    InvalidTimestamp = 54,
    ArithmeticOverflow = 55,

    // Security errors
    Reentrancy = 60,
}
