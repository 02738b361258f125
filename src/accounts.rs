// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! # Account Registry
//!
//! Owns every signing key known to the process, one [`AccountIdentity`] and
//! one [`SubmissionLock`] per key, and resolves which identity is active for
//! a given execution context.
//!
//! ## Active identity
//!
//! There is one process-wide *default* identity and, per [`ContextId`], an
//! optional *binding*. A context without a binding follows the default.
//!
//! - [`AccountRegistry::switch_local`] rebinds only the calling context.
//! - [`AccountRegistry::switch_global`] moves the default and rebinds the
//!   calling context.
//! - [`AccountRegistry::fixate`] snapshots the current default into the
//!   calling context's binding.
//!
//! ## Ordering contract
//!
//! A global switch does not touch other contexts' bindings. A context that
//! called `fixate` before the switch keeps its snapshot; a context that has
//! not fixated yet observes the new default on its next lookup, even if its
//! unit of work already started. Concurrent workers must therefore call
//! `fixate` as the first step of each unit of work. The registry adds no
//! synchronization to hide this window.

use std::collections::HashMap;
use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, RwLock, RwLockReadGuard, RwLockWriteGuard};

use alloy::primitives::Address;
use alloy::signers::local::PrivateKeySigner;
use tokio::sync::{Mutex, OwnedMutexGuard};

use crate::blockchain::signing::parse_private_key;
use crate::error::{ClientError, ClientResult};

static NEXT_CONTEXT_ID: AtomicU64 = AtomicU64::new(1);

/// Identifier of an execution context (task, worker, session).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ContextId(u64);

impl ContextId {
    /// Allocate a process-unique id.
    pub fn next() -> Self {
        Self(NEXT_CONTEXT_ID.fetch_add(1, Ordering::Relaxed))
    }
}

impl fmt::Display for ContextId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "ctx-{}", self.0)
    }
}

/// A signing key and the address derived from it.
#[derive(Clone)]
pub struct AccountIdentity {
    signer: PrivateKeySigner,
    address: Address,
}

impl AccountIdentity {
    fn new(signer: PrivateKeySigner) -> Self {
        let address = signer.address();
        Self { signer, address }
    }

    pub fn address(&self) -> Address {
        self.address
    }

    /// EIP-55 checksum form of the address.
    pub fn checksum_address(&self) -> String {
        self.address.to_checksum(None)
    }

    pub(crate) fn signer(&self) -> &PrivateKeySigner {
        &self.signer
    }
}

impl PartialEq for AccountIdentity {
    fn eq(&self, other: &Self) -> bool {
        self.address == other.address
    }
}

impl Eq for AccountIdentity {}

// Key material stays out of Debug output.
impl fmt::Debug for AccountIdentity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AccountIdentity")
            .field("address", &self.checksum_address())
            .finish_non_exhaustive()
    }
}

/// Per-key mutual exclusion around nonce read, signing and broadcast.
#[derive(Debug, Clone, Default)]
pub struct SubmissionLock(Arc<Mutex<()>>);

impl SubmissionLock {
    pub async fn acquire(&self) -> OwnedMutexGuard<()> {
        self.0.clone().lock_owned().await
    }

    /// Non-blocking acquire; `None` while a submission is in flight.
    pub fn try_acquire(&self) -> Option<OwnedMutexGuard<()>> {
        self.0.clone().try_lock_owned().ok()
    }

    /// Whether both handles guard the same key.
    pub fn same_lock(&self, other: &SubmissionLock) -> bool {
        Arc::ptr_eq(&self.0, &other.0)
    }
}

struct RegisteredAccount {
    identity: AccountIdentity,
    lock: SubmissionLock,
}

/// Registry of signing keys and per-context active identities.
#[derive(Default)]
pub struct AccountRegistry {
    accounts: RwLock<HashMap<Address, RegisteredAccount>>,
    default: RwLock<Option<AccountIdentity>>,
    bindings: RwLock<HashMap<ContextId, AccountIdentity>>,
}

impl AccountRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a registry whose process-wide default is `key`.
    pub fn with_default(key: &str) -> ClientResult<Self> {
        let registry = Self::new();
        let identity = registry.register(key)?;
        *write(&registry.default) = Some(identity);
        Ok(registry)
    }

    /// Register a hex or PEM private key. Idempotent per key.
    pub fn register(&self, key: &str) -> ClientResult<AccountIdentity> {
        let signer = parse_private_key(key)?;
        Ok(self.register_signer(signer))
    }

    /// Register an already-parsed signer. Idempotent per key: an existing
    /// identity and its lock are kept.
    pub fn register_signer(&self, signer: PrivateKeySigner) -> AccountIdentity {
        let address = signer.address();
        let mut accounts = write(&self.accounts);
        let entry = accounts.entry(address).or_insert_with(|| {
            tracing::debug!(address = %address, "Registered account");
            RegisteredAccount {
                identity: AccountIdentity::new(signer),
                lock: SubmissionLock::default(),
            }
        });
        entry.identity.clone()
    }

    /// Bind `ctx` to `key` without touching the default or other contexts.
    pub fn switch_local(&self, ctx: ContextId, key: &str) -> ClientResult<AccountIdentity> {
        let identity = self.register(key)?;
        write(&self.bindings).insert(ctx, identity.clone());
        tracing::debug!(context = %ctx, address = %identity.address(), "Switched local account");
        Ok(identity)
    }

    /// Move the process-wide default to `key` and bind `ctx` to it.
    ///
    /// Contexts that already fixated keep their binding; see the module
    /// docs for the ordering contract.
    pub fn switch_global(&self, ctx: ContextId, key: &str) -> ClientResult<AccountIdentity> {
        let identity = self.register(key)?;
        *write(&self.default) = Some(identity.clone());
        write(&self.bindings).insert(ctx, identity.clone());
        tracing::info!(context = %ctx, address = %identity.address(), "Switched default account");
        Ok(identity)
    }

    /// Copy the current default into the binding of `ctx`.
    pub fn fixate(&self, ctx: ContextId) -> ClientResult<AccountIdentity> {
        let identity = self.default_identity().ok_or_else(no_default)?;
        write(&self.bindings).insert(ctx, identity.clone());
        Ok(identity)
    }

    /// The identity active for `ctx`: its binding, else the default.
    pub fn current_identity(&self, ctx: ContextId) -> ClientResult<AccountIdentity> {
        if let Some(identity) = read(&self.bindings).get(&ctx) {
            return Ok(identity.clone());
        }
        self.default_identity().ok_or_else(no_default)
    }

    pub fn default_identity(&self) -> Option<AccountIdentity> {
        read(&self.default).clone()
    }

    /// Drop the binding of a finished context.
    pub fn release(&self, ctx: ContextId) {
        write(&self.bindings).remove(&ctx);
    }

    /// Look up a registered identity by address.
    pub fn identity(&self, address: Address) -> ClientResult<AccountIdentity> {
        read(&self.accounts)
            .get(&address)
            .map(|account| account.identity.clone())
            .ok_or_else(|| unknown(address))
    }

    /// The submission lock of a registered address.
    pub fn submission_lock(&self, address: Address) -> ClientResult<SubmissionLock> {
        read(&self.accounts)
            .get(&address)
            .map(|account| account.lock.clone())
            .ok_or_else(|| unknown(address))
    }

    /// Addresses of all registered accounts.
    pub fn addresses(&self) -> Vec<Address> {
        read(&self.accounts).keys().copied().collect()
    }
}

fn unknown(address: Address) -> ClientError {
    ClientError::UnknownAccount(address.to_checksum(None))
}

fn no_default() -> ClientError {
    ClientError::UnknownAccount("no default account configured".to_string())
}

// Every write is a single insert or replace; poisoning is ignored.
fn read<T>(lock: &RwLock<T>) -> RwLockReadGuard<'_, T> {
    lock.read().unwrap_or_else(|e| e.into_inner())
}

fn write<T>(lock: &RwLock<T>) -> RwLockWriteGuard<'_, T> {
    lock.write().unwrap_or_else(|e| e.into_inner())
}
