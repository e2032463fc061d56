//! The Coordinator-owned agent pool (spec.md §3 "Lifecycle transitions",
//! §4.5 "Re-rank", §9 "Agents reference each other only by
//! `(walletAddress, endpoint)` tuples").
//!
//! A single coarse lock over a `HashMap<wallet_address, Agent>` (spec.md
//! §5: "a coarse-grained mutex over the pool map is acceptable given low
//! write rates").

use std::collections::HashMap;

use pof_types::{Agent, AgentStatus, MIN_STAKE};

/// What changed for one agent during a re-rank pass — used to decide which
/// `agent_joined`/`agent_evicted` events to broadcast (spec.md §4.5 step 1).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Transition {
    pub wallet_address: String,
    pub agent_name: String,
    pub from: AgentStatus,
    pub to: AgentStatus,
}

#[derive(Default)]
pub struct Pool {
    agents: HashMap<String, Agent>,
}

impl Pool {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn contains_wallet(&self, wallet_address: &str) -> bool {
        self.agents.contains_key(wallet_address)
    }

    /// spec.md §9 resolved Open Question 2: the duplicate-wallet check
    /// (registration step 5) only considers agents that are not already
    /// terminal, so an `offline`/`deleted` wallet is free to re-register.
    pub fn has_active_registration(&self, wallet_address: &str) -> bool {
        self.agents
            .get(wallet_address)
            .is_some_and(|a| !a.status.is_terminal())
    }

    pub fn insert(&mut self, agent: Agent) {
        self.agents.insert(agent.wallet_address.clone(), agent);
    }

    pub fn get(&self, wallet_address: &str) -> Option<&Agent> {
        self.agents.get(wallet_address)
    }

    pub fn get_mut(&mut self, wallet_address: &str) -> Option<&mut Agent> {
        self.agents.get_mut(wallet_address)
    }

    /// Agents are keyed by wallet address, but some endpoints (agent
    /// messages, donation confirmations) are only told the agent's name
    /// (spec.md §4.5 "authenticated by agent-name presence in the pool").
    pub fn get_mut_by_name(&mut self, agent_name: &str) -> Option<&mut Agent> {
        self.agents.values_mut().find(|a| a.agent_name == agent_name)
    }

    pub fn len(&self) -> usize {
        self.agents.len()
    }

    pub fn is_empty(&self) -> bool {
        self.agents.is_empty()
    }

    pub fn all(&self) -> impl Iterator<Item = &Agent> {
        self.agents.values()
    }

    pub fn active_wallets(&self) -> Vec<String> {
        self.agents
            .values()
            .filter(|a| a.status == AgentStatus::Active)
            .map(|a| a.wallet_address.clone())
            .collect()
    }

    /// Re-rank the pool (spec.md §4.5 step 1, §3 "Lifecycle transitions"):
    /// among non-terminal agents sorted by descending balance, the top
    /// `max_active` with balance >= [`MIN_STAKE`] become `active`, the rest
    /// above `MIN_STAKE` become `benched`, and anyone below `MIN_STAKE`
    /// becomes `broke`. Terminal (`offline`/`deleted`) agents are left
    /// alone — re-ranking never resurrects them (spec.md §3 "never
    /// re-enter without a new registration").
    ///
    /// Returns every status change so the caller can broadcast the right
    /// `agent_joined`/`agent_evicted` events in order.
    pub fn re_rank(&mut self, max_active: usize) -> Vec<Transition> {
        let mut ranked: Vec<&mut Agent> = self
            .agents
            .values_mut()
            .filter(|a| !a.status.is_terminal())
            .collect();
        ranked.sort_by(|a, b| b.balance.cmp(&a.balance));

        let mut transitions = Vec::new();
        for (rank, agent) in ranked.into_iter().enumerate() {
            let new_status = if agent.balance < MIN_STAKE {
                AgentStatus::Broke
            } else if rank < max_active {
                AgentStatus::Active
            } else {
                AgentStatus::Benched
            };

            if new_status != agent.status {
                transitions.push(Transition {
                    wallet_address: agent.wallet_address.clone(),
                    agent_name: agent.agent_name.clone(),
                    from: agent.status,
                    to: new_status,
                });
                agent.status = new_status;
            }
        }
        transitions
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pof_types::BirthCertificate;

    fn dummy_cert(name: &str) -> BirthCertificate {
        BirthCertificate {
            agent_name: name.to_string(),
            wallet_address: format!("W-{name}"),
            docker_image: "img".into(),
            code_hash: "h".into(),
            rtmr3: "r".into(),
            timestamp: 0,
            tee_pubkey: "k".into(),
            attestation_quote: "q".into(),
            tee_signature: "s1".into(),
            wallet_signature: "s2".into(),
        }
    }

    fn agent(name: &str, balance: u64) -> Agent {
        Agent::new(
            name.to_string(),
            format!("W-{name}"),
            format!("http://{name}"),
            dummy_cert(name),
            0,
            balance,
        )
    }

    #[test]
    fn top_n_by_balance_become_active_rest_benched_or_broke() {
        let mut pool = Pool::new();
        pool.insert(agent("alice", 1_000_000));
        pool.insert(agent("bob", 500_000));
        pool.insert(agent("carol", 500_000));
        pool.insert(agent("dave", 5_000)); // below MIN_STAKE (10_000)

        let transitions = pool.re_rank(2);
        assert_eq!(pool.get("W-alice").unwrap().status, AgentStatus::Active);
        assert_eq!(pool.get("W-dave").unwrap().status, AgentStatus::Broke);
        // Exactly one of bob/carol is active, the other benched, with the tie
        // broken by stable sort order (insertion order here).
        let bob = pool.get("W-bob").unwrap().status;
        let carol = pool.get("W-carol").unwrap().status;
        assert_ne!(bob, carol);
        assert!(matches!(bob, AgentStatus::Active | AgentStatus::Benched));

        assert!(!transitions.is_empty());
        assert!(transitions.iter().any(|t| t.wallet_address == "W-alice"
            && t.to == AgentStatus::Active));
        assert!(transitions
            .iter()
            .any(|t| t.wallet_address == "W-dave" && t.to == AgentStatus::Broke));
    }

    #[test]
    fn re_rank_never_touches_terminal_agents() {
        let mut pool = Pool::new();
        let mut offline = agent("eve", 1_000_000);
        offline.status = AgentStatus::Offline;
        pool.insert(offline);

        let transitions = pool.re_rank(5);
        assert!(transitions.is_empty());
        assert_eq!(pool.get("W-eve").unwrap().status, AgentStatus::Offline);
    }

    #[test]
    fn offline_wallet_does_not_block_a_fresh_registration() {
        let mut pool = Pool::new();
        let mut offline = agent("eve", 0);
        offline.status = AgentStatus::Offline;
        pool.insert(offline);

        assert!(!pool.has_active_registration("W-eve"));
    }
}
