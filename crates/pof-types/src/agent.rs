//! The Coordinator-owned, mutable [`Agent`] record (spec.md §3).

use serde::{Deserialize, Serialize};

use crate::birth_cert::BirthCertificate;

/// Lifecycle status, Coordinator-owned (spec.md §3 "Lifecycle transitions").
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AgentStatus {
    Active,
    Benched,
    Broke,
    Offline,
    Deleted,
}

impl AgentStatus {
    /// `offline`/`deleted` agents never re-enter the pool without a fresh
    /// registration (spec.md §3, and Open Question resolution in SPEC_FULL.md).
    pub fn is_terminal(self) -> bool {
        matches!(self, AgentStatus::Offline | AgentStatus::Deleted)
    }
}

/// A registered agent as tracked by the Coordinator.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Agent {
    // Identity
    pub agent_name: String,
    pub wallet_address: String,
    pub endpoint: String,
    pub birth_cert: BirthCertificate,
    pub registered_at: u64,

    // Economics
    pub balance: u64,
    pub wins: u64,
    pub losses: u64,
    /// Signed: `>0` on a win streak, `<0` on a loss streak, `0` at start.
    pub current_streak: i64,
    pub longest_streak: i64,
    pub total_donations: u64,

    // Lifecycle
    pub status: AgentStatus,
}

impl Agent {
    pub fn new(
        agent_name: String,
        wallet_address: String,
        endpoint: String,
        birth_cert: BirthCertificate,
        registered_at: u64,
        initial_balance: u64,
    ) -> Self {
        Self {
            agent_name,
            wallet_address,
            endpoint,
            birth_cert,
            registered_at,
            balance: initial_balance,
            wins: 0,
            losses: 0,
            current_streak: 0,
            longest_streak: 0,
            total_donations: 0,
            status: AgentStatus::Active,
        }
    }

    /// Record a win: increments `wins`, extends (or starts) a positive streak.
    pub fn record_win(&mut self, stake: u64) {
        self.wins += 1;
        self.balance = self.balance.saturating_add(stake);
        self.current_streak = if self.current_streak > 0 {
            self.current_streak + 1
        } else {
            1
        };
        self.longest_streak = self.longest_streak.max(self.current_streak);
    }

    /// Record a loss: increments `losses`, extends (or starts) a negative streak.
    pub fn record_loss(&mut self, stake: u64) {
        self.losses += 1;
        self.balance = self.balance.saturating_sub(stake);
        self.current_streak = if self.current_streak < 0 {
            self.current_streak - 1
        } else {
            -1
        };
    }

    pub fn record_donation(&mut self, amount: u64) {
        self.total_donations = self.total_donations.saturating_add(amount);
        self.balance = self.balance.saturating_add(amount);
    }
}
