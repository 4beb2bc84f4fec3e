#![no_std]

mod error;
mod events;
mod types;

use soroban_sdk::{contract, contractimpl, log, token, Address, Env, String, Vec};
use time::OffsetDateTime;

use error::Error;
use types::{Agreement, AgreementStatus, AuditKind, AuditRecord, DataKey};

const DAY_IN_LEDGERS: u32 = 17280; // ~24 hours
const LEDGER_TTL_THRESHOLD: u32 = DAY_IN_LEDGERS * 30; // 30 days
const LEDGER_TTL_EXTEND: u32 = DAY_IN_LEDGERS * 365; // 1 year

const BPS_DENOMINATOR: i128 = 10_000;
const DEFAULT_FEE_RATE: u32 = 100; // 1%
const MAX_FEE_RATE: u32 = 1_000; // 10%

// RAII reentrancy guard - one lock per agreement, released when dropped
struct ReentrancyGuard<'a> {
    env: &'a Env,
    key: DataKey,
}

impl<'a> ReentrancyGuard<'a> {
    fn new(env: &'a Env, agreement_id: u64) -> Result<Self, Error> {
        let key = DataKey::Lock(agreement_id);
        if env.storage().persistent().has(&key) {
            return Err(Error::Reentrancy);
        }
        env.storage().persistent().set(&key, &true);
        Ok(ReentrancyGuard { env, key })
    }
}

impl<'a> Drop for ReentrancyGuard<'a> {
    fn drop(&mut self) {
        self.env.storage().persistent().remove(&self.key);
    }
}

#[contract]
pub struct RentalEscrow;

#[contractimpl]
impl RentalEscrow {
    pub fn __constructor(env: Env, owner: Address, token: Address, platform_account: Address) {
        owner.require_auth();

        env.storage().instance().set(&DataKey::Owner, &owner);
        env.storage().instance().set(&DataKey::Token, &token);
        env.storage()
            .instance()
            .set(&DataKey::PlatformAccount, &platform_account);
        env.storage()
            .instance()
            .set(&DataKey::FeeRate, &DEFAULT_FEE_RATE);
        env.storage()
            .instance()
            .set(&DataKey::AgreementCounter, &0u64);
    }

    // Owner functions

    pub fn owner(env: Env) -> Result<Address, Error> {
        env.storage()
            .instance()
            .get(&DataKey::Owner)
            .ok_or(Error::OwnerNotSet)
    }

    // Step 1 of 2: the owner nominates a successor
    pub fn transfer_ownership(
        env: Env,
        caller: Address,
        new_owner: Address,
        live_until_ledger: u32,
    ) -> Result<(), Error> {
        Self::require_owner(&env, &caller)?;

        // An unexpired offer must be cancelled before it can be replaced
        if let Some(expiry) = env
            .storage()
            .instance()
            .get::<DataKey, u32>(&DataKey::TransferExpiry)
        {
            if env.ledger().sequence() <= expiry {
                return Err(Error::PendingOwnershipTransferExists);
            }
        }

        env.storage()
            .instance()
            .set(&DataKey::PendingOwner, &new_owner);
        env.storage()
            .instance()
            .set(&DataKey::TransferExpiry, &live_until_ledger);

        events::OwnershipTransferInitiated {
            new_owner: new_owner.clone(),
        }
        .publish(&env);

        Ok(())
    }

    // Step 2 of 2: the nominee takes over before the offer expires
    pub fn accept_ownership(env: Env) -> Result<(), Error> {
        let new_owner: Address = env
            .storage()
            .instance()
            .get(&DataKey::PendingOwner)
            .ok_or(Error::NoPendingOwnershipTransfer)?;

        new_owner.require_auth();

        let expiry: u32 = env
            .storage()
            .instance()
            .get(&DataKey::TransferExpiry)
            .ok_or(Error::NoPendingOwnershipTransfer)?;

        if env.ledger().sequence() > expiry {
            return Err(Error::OwnershipTransferExpired);
        }

        env.storage().instance().set(&DataKey::Owner, &new_owner);
        env.storage().instance().remove(&DataKey::PendingOwner);
        env.storage().instance().remove(&DataKey::TransferExpiry);

        log!(&env, "ownership transferred", new_owner);
        events::OwnershipTransferred {
            new_owner: new_owner.clone(),
        }
        .publish(&env);

        Ok(())
    }

    pub fn cancel_ownership_transfer(env: Env, caller: Address) -> Result<(), Error> {
        Self::require_owner(&env, &caller)?;

        if !env.storage().instance().has(&DataKey::PendingOwner) {
            return Err(Error::NoPendingOwnershipTransfer);
        }

        env.storage().instance().remove(&DataKey::PendingOwner);
        env.storage().instance().remove(&DataKey::TransferExpiry);

        Ok(())
    }

    pub fn update_platform_account(
        env: Env,
        caller: Address,
        account: Address,
    ) -> Result<(), Error> {
        Self::require_owner(&env, &caller)?;

        env.storage()
            .instance()
            .set(&DataKey::PlatformAccount, &account);

        events::PlatformAccountUpdated {
            account: account.clone(),
        }
        .publish(&env);

        Ok(())
    }

    pub fn platform_account(env: Env) -> Result<Address, Error> {
        env.storage()
            .instance()
            .get(&DataKey::PlatformAccount)
            .ok_or(Error::PlatformAccountNotSet)
    }

    /// Changes the fee rate applied by later `sign_contract` and `pay_rent`
    /// calls. Agreements already signed keep the fee they were charged.
    pub fn update_platform_fee_rate(env: Env, caller: Address, new_rate: u32) -> Result<(), Error> {
        Self::require_owner(&env, &caller)?;

        Self::validate_fee_rate(new_rate)?;

        let old_rate = Self::platform_fee_rate(env.clone())?;
        env.storage().instance().set(&DataKey::FeeRate, &new_rate);

        log!(&env, "platform fee rate updated", old_rate, new_rate);
        events::PlatformFeeRateUpdated { old_rate, new_rate }.publish(&env);

        Ok(())
    }

    // Fee rate in basis points (e.g., 100 = 1.00%)
    pub fn platform_fee_rate(env: Env) -> Result<u32, Error> {
        env.storage()
            .instance()
            .get(&DataKey::FeeRate)
            .ok_or(Error::FeeRateNotSet)
    }

    pub fn token(env: Env) -> Result<Address, Error> {
        env.storage()
            .instance()
            .get(&DataKey::Token)
            .ok_or(Error::TokenNotSet)
    }

    // Agreement lifecycle

    pub fn create_agreement(
        env: Env,
        landlord: Address,
        property_id: String,
        tenant: Address,
        monthly_rent: i128,
        security_deposit: i128,
        lease_duration: u64,
        contract_terms: String,
    ) -> Result<u64, Error> {
        landlord.require_auth();

        if tenant == landlord || tenant == env.current_contract_address() {
            return Err(Error::InvalidTenant);
        }
        if monthly_rent <= 0 {
            return Err(Error::InvalidRent);
        }
        if security_deposit <= 0 {
            return Err(Error::InvalidDeposit);
        }
        if lease_duration == 0 {
            return Err(Error::InvalidLeaseDuration);
        }

        let agreement_id = Self::next_id(&env);

        let agreement = Agreement {
            id: agreement_id,
            property_id: property_id.clone(),
            landlord: landlord.clone(),
            tenant: tenant.clone(),
            monthly_rent,
            security_deposit,
            lease_duration,
            contract_terms,
            status: AgreementStatus::Pending,
            security_deposit_paid: false,
            deposit_held: 0,
            start_date: 0,
            end_date: 0,
            created_at: env.ledger().timestamp(),
            rent_payments: 0,
            total_rent_paid: 0,
            last_paid_period: 0,
        };
        Self::save_agreement(&env, &agreement);

        Self::append_index(
            &env,
            DataKey::LandlordAgreements(landlord.clone()),
            agreement_id,
        );
        Self::append_index(&env, DataKey::TenantAgreements(tenant.clone()), agreement_id);
        Self::record(&env, agreement_id, AuditKind::Created, &landlord, 0);
        Self::extend_instance_ttl(&env);

        log!(&env, "agreement created", agreement_id, landlord, tenant);
        events::ContractCreated {
            agreement_id,
            property_id,
            landlord,
            tenant,
        }
        .publish(&env);

        Ok(agreement_id)
    }

    /// Tenant accepts the agreement and places the security deposit in
    /// custody. Exactly `security_deposit` is collected even when
    /// `deposit_value` offers more; the platform fee is skimmed from it and
    /// the remainder is held until the agreement closes.
    pub fn sign_contract(
        env: Env,
        caller: Address,
        agreement_id: u64,
        deposit_value: i128,
    ) -> Result<(), Error> {
        caller.require_auth();
        let _guard = ReentrancyGuard::new(&env, agreement_id)?;

        let mut agreement = Self::load_agreement(&env, agreement_id)?;

        if caller != agreement.tenant {
            return Err(Error::Unauthorized);
        }
        if agreement.status != AgreementStatus::Pending {
            return Err(Error::WrongState);
        }
        if deposit_value < agreement.security_deposit {
            return Err(Error::InsufficientDeposit);
        }

        let fee_rate = Self::platform_fee_rate(env.clone())?;
        let fee = Self::calculate_fee(agreement.security_deposit, fee_rate)?;
        let net_deposit = agreement.security_deposit - fee;

        let now = env.ledger().timestamp();
        let end_date = now
            .checked_add(agreement.lease_duration)
            .ok_or(Error::ArithmeticOverflow)?;

        let token_client = Self::token_client(&env)?;
        let platform_account = Self::platform_account(env.clone())?;

        agreement.status = AgreementStatus::Signed;
        agreement.security_deposit_paid = true;
        agreement.deposit_held = net_deposit;
        agreement.start_date = now;
        agreement.end_date = end_date;
        Self::save_agreement(&env, &agreement);

        Self::record(&env, agreement_id, AuditKind::Signed, &caller, 0);
        Self::record(
            &env,
            agreement_id,
            AuditKind::DepositPaid,
            &caller,
            net_deposit,
        );
        Self::extend_instance_ttl(&env);

        let ledger = env.current_contract_address();
        token_client.transfer(&caller, &ledger, &agreement.security_deposit);
        if fee > 0 {
            token_client.transfer(&ledger, &platform_account, &fee);
        }

        log!(&env, "agreement signed", agreement_id, net_deposit, fee);
        events::ContractSigned {
            agreement_id,
            tenant: caller,
        }
        .publish(&env);
        events::SecurityDepositPaid {
            agreement_id,
            amount: net_deposit,
        }
        .publish(&env);

        Ok(())
    }

    // Rent goes straight to the landlord, less the platform fee.
    // Payment cadence is not enforced.
    pub fn pay_rent(
        env: Env,
        caller: Address,
        agreement_id: u64,
        rent_value: i128,
    ) -> Result<(), Error> {
        caller.require_auth();
        let _guard = ReentrancyGuard::new(&env, agreement_id)?;

        let mut agreement = Self::load_agreement(&env, agreement_id)?;

        if caller != agreement.tenant {
            return Err(Error::Unauthorized);
        }
        if agreement.status != AgreementStatus::Signed {
            return Err(Error::WrongState);
        }
        if rent_value < agreement.monthly_rent {
            return Err(Error::InsufficientRent);
        }

        let fee_rate = Self::platform_fee_rate(env.clone())?;
        let fee = Self::calculate_fee(rent_value, fee_rate)?;
        let net_amount = rent_value - fee;
        let period = Self::billing_period(env.ledger().timestamp())?;

        let token_client = Self::token_client(&env)?;
        let platform_account = Self::platform_account(env.clone())?;

        agreement.rent_payments = agreement
            .rent_payments
            .checked_add(1)
            .ok_or(Error::ArithmeticOverflow)?;
        agreement.total_rent_paid = agreement
            .total_rent_paid
            .checked_add(rent_value)
            .ok_or(Error::ArithmeticOverflow)?;
        agreement.last_paid_period = period;
        Self::save_agreement(&env, &agreement);

        Self::record(&env, agreement_id, AuditKind::RentPaid, &caller, net_amount);
        Self::extend_instance_ttl(&env);

        let ledger = env.current_contract_address();
        token_client.transfer(&caller, &ledger, &rent_value);
        token_client.transfer(&ledger, &agreement.landlord, &net_amount);
        if fee > 0 {
            token_client.transfer(&ledger, &platform_account, &fee);
        }

        log!(&env, "rent paid", agreement_id, net_amount, fee);
        events::RentPaid {
            agreement_id,
            net_amount,
            payment_number: agreement.rent_payments,
            period,
        }
        .publish(&env);

        Ok(())
    }

    /// Either party may terminate a pending or signed agreement. A held
    /// deposit goes back to the tenant.
    pub fn terminate_contract(env: Env, caller: Address, agreement_id: u64) -> Result<(), Error> {
        caller.require_auth();
        let _guard = ReentrancyGuard::new(&env, agreement_id)?;

        let agreement = Self::load_agreement(&env, agreement_id)?;

        if !agreement.is_party(&caller) {
            return Err(Error::Unauthorized);
        }
        if agreement.status.is_terminal() {
            return Err(Error::WrongState);
        }

        Self::close_agreement(&env, agreement, &caller, AgreementStatus::Terminated)
    }

    /// Either party may close a signed agreement once its lease has run out
    pub fn complete_contract(env: Env, caller: Address, agreement_id: u64) -> Result<(), Error> {
        caller.require_auth();
        let _guard = ReentrancyGuard::new(&env, agreement_id)?;

        let agreement = Self::load_agreement(&env, agreement_id)?;

        if !agreement.is_party(&caller) {
            return Err(Error::Unauthorized);
        }
        if agreement.status != AgreementStatus::Signed {
            return Err(Error::WrongState);
        }
        if env.ledger().timestamp() <= agreement.end_date {
            return Err(Error::LeaseNotEnded);
        }

        Self::close_agreement(&env, agreement, &caller, AgreementStatus::Completed)
    }

    // Queries

    pub fn get_agreement(env: Env, agreement_id: u64) -> Result<Agreement, Error> {
        Self::load_agreement(&env, agreement_id)
    }

    pub fn get_agreements_by_landlord(env: Env, landlord: Address) -> Vec<u64> {
        Self::load_index(&env, DataKey::LandlordAgreements(landlord))
    }

    pub fn get_agreements_by_tenant(env: Env, tenant: Address) -> Vec<u64> {
        Self::load_index(&env, DataKey::TenantAgreements(tenant))
    }

    pub fn get_agreement_history(env: Env, agreement_id: u64) -> Result<Vec<AuditRecord>, Error> {
        if !env
            .storage()
            .persistent()
            .has(&DataKey::Agreement(agreement_id))
        {
            return Err(Error::NotFound);
        }

        let history_key = DataKey::History(agreement_id);
        Self::extend_ttl(&env, &history_key);
        Ok(env
            .storage()
            .persistent()
            .get(&history_key)
            .unwrap_or(Vec::new(&env)))
    }

    pub fn next_agreement_id(env: Env) -> u64 {
        let counter: u64 = env
            .storage()
            .instance()
            .get(&DataKey::AgreementCounter)
            .unwrap_or(0);
        counter + 1
    }

    // An expired lease stays Signed until someone completes it
    pub fn is_lease_expired(env: Env, agreement_id: u64) -> Result<bool, Error> {
        let agreement = Self::load_agreement(&env, agreement_id)?;
        Ok(agreement.status == AgreementStatus::Signed
            && env.ledger().timestamp() > agreement.end_date)
    }

    // Helper Functions

    fn extend_ttl(env: &Env, key: &DataKey) {
        if env.storage().persistent().has(key) {
            env.storage()
                .persistent()
                .extend_ttl(key, LEDGER_TTL_THRESHOLD, LEDGER_TTL_EXTEND);
        }
    }

    fn extend_instance_ttl(env: &Env) {
        env.storage()
            .instance()
            .extend_ttl(LEDGER_TTL_THRESHOLD, LEDGER_TTL_EXTEND);
    }

    fn require_owner(env: &Env, caller: &Address) -> Result<(), Error> {
        caller.require_auth();
        let owner = Self::owner(env.clone())?;
        if *caller != owner {
            return Err(Error::Unauthorized);
        }
        Ok(())
    }

    // IDs start from 1; 0 is never a valid agreement
    fn next_id(env: &Env) -> u64 {
        let counter: u64 = env
            .storage()
            .instance()
            .get(&DataKey::AgreementCounter)
            .unwrap_or(0);
        let next_id = counter + 1;
        env.storage()
            .instance()
            .set(&DataKey::AgreementCounter, &next_id);
        next_id
    }

    fn load_agreement(env: &Env, agreement_id: u64) -> Result<Agreement, Error> {
        let key = DataKey::Agreement(agreement_id);
        let agreement: Agreement = env
            .storage()
            .persistent()
            .get(&key)
            .ok_or(Error::NotFound)?;
        Self::extend_ttl(env, &key);
        Ok(agreement)
    }

    fn save_agreement(env: &Env, agreement: &Agreement) {
        let key = DataKey::Agreement(agreement.id);
        env.storage().persistent().set(&key, agreement);
        Self::extend_ttl(env, &key);
    }

    fn load_index(env: &Env, key: DataKey) -> Vec<u64> {
        Self::extend_ttl(env, &key);
        env.storage()
            .persistent()
            .get(&key)
            .unwrap_or(Vec::new(env))
    }

    fn append_index(env: &Env, key: DataKey, agreement_id: u64) {
        let mut ids: Vec<u64> = env
            .storage()
            .persistent()
            .get(&key)
            .unwrap_or(Vec::new(env));
        ids.push_back(agreement_id);
        env.storage().persistent().set(&key, &ids);
        Self::extend_ttl(env, &key);
    }

    fn record(env: &Env, agreement_id: u64, kind: AuditKind, actor: &Address, amount: i128) {
        let key = DataKey::History(agreement_id);
        let mut history: Vec<AuditRecord> = env
            .storage()
            .persistent()
            .get(&key)
            .unwrap_or(Vec::new(env));
        history.push_back(AuditRecord {
            kind,
            actor: actor.clone(),
            amount,
            timestamp: env.ledger().timestamp(),
        });
        env.storage().persistent().set(&key, &history);
        Self::extend_ttl(env, &key);
    }

    fn token_client(env: &Env) -> Result<token::TokenClient<'_>, Error> {
        let token = Self::token(env.clone())?;
        Ok(token::TokenClient::new(env, &token))
    }

    fn validate_fee_rate(fee_rate: u32) -> Result<(), Error> {
        if fee_rate > MAX_FEE_RATE {
            return Err(Error::FeeTooHigh);
        }
        Ok(())
    }

    // Fee truncates toward zero, so fee + net always equals the gross amount
    fn calculate_fee(amount: i128, fee_rate: u32) -> Result<i128, Error> {
        amount
            .checked_mul(fee_rate as i128)
            .map(|scaled| scaled / BPS_DENOMINATOR)
            .ok_or(Error::ArithmeticOverflow)
    }

    // Calendar month of a ledger timestamp in YYYYMM format
    fn billing_period(timestamp: u64) -> Result<u32, Error> {
        let seconds = i64::try_from(timestamp).map_err(|_| Error::InvalidTimestamp)?;
        let datetime =
            OffsetDateTime::from_unix_timestamp(seconds).map_err(|_| Error::InvalidTimestamp)?;

        let year = datetime.year() as u32;
        let month = datetime.month() as u32;

        Ok(year * 100 + month)
    }

    /// Shared closing path for termination and natural completion: moves the
    /// agreement into its terminal status and refunds the held deposit to the
    /// tenant. `deposit_held` is zeroed before the transfer so a deposit can
    /// only ever leave custody once.
    fn close_agreement(
        env: &Env,
        mut agreement: Agreement,
        closed_by: &Address,
        status: AgreementStatus,
    ) -> Result<(), Error> {
        let agreement_id = agreement.id;
        let refund = agreement.deposit_held;
        let refund_due = agreement.security_deposit_paid && refund > 0;
        let token_client = Self::token_client(env)?;

        agreement.status = status;
        agreement.deposit_held = 0;
        Self::save_agreement(env, &agreement);

        let kind = match status {
            AgreementStatus::Completed => AuditKind::Completed,
            _ => AuditKind::Terminated,
        };
        Self::record(env, agreement_id, kind, closed_by, 0);
        if refund_due {
            Self::record(
                env,
                agreement_id,
                AuditKind::DepositReturned,
                &agreement.tenant,
                refund,
            );
        }
        Self::extend_instance_ttl(env);

        if refund_due {
            token_client.transfer(&env.current_contract_address(), &agreement.tenant, &refund);
        }

        log!(env, "agreement closed", agreement_id, refund);
        match status {
            AgreementStatus::Completed => events::ContractCompleted {
                agreement_id,
                completed_by: closed_by.clone(),
            }
            .publish(env),
            _ => events::ContractTerminated {
                agreement_id,
                terminated_by: closed_by.clone(),
            }
            .publish(env),
        }
        if refund_due {
            events::SecurityDepositReturned {
                agreement_id,
                amount: refund,
            }
            .publish(env);
        }

        Ok(())
    }
}
