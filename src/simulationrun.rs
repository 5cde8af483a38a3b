/// This file contains SimulationRun, which drives an auction through a fixed number of rounds,
/// and SimulationStat, which aggregates the rounds into per-bidder and overall statistics.

use crate::auction::{Auction, AuctionError, RoundResult};
use crate::logger::{Logger, LogEvent};
use crate::logln;
use crate::utils::TOTAL_SIMULATION_RUNS;
use std::sync::atomic::Ordering;

/// Population sizes and round count, the whole configuration of one simulation
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SimulationParams {
    pub num_users: usize,
    pub num_bidders: usize,
    pub num_rounds: usize,
}

/// Results of running an auction for a number of rounds
/// Rounds are matched to balance snapshots by index
pub struct SimulationRun {
    pub results: Vec<RoundResult>,
    /// Balance of every bidder after each round, indexed [round][bidder_id]
    pub balance_history: Vec<Vec<Option<f64>>>,
}

impl SimulationRun {
    /// Execute `num_rounds` rounds of the auction and collect the results
    pub fn new(auction: &mut Auction, num_rounds: usize, logger: &mut Logger) -> Result<Self, AuctionError> {
        TOTAL_SIMULATION_RUNS.fetch_add(1, Ordering::Relaxed);

        let mut results = Vec::with_capacity(num_rounds);
        let mut balance_history = Vec::with_capacity(num_rounds);

        for _ in 0..num_rounds {
            let result = auction.execute_round(logger)?;
            let balances = auction.balances();

            if logger.is_enabled(LogEvent::Round) {
                let formatted: Vec<String> = balances.iter().enumerate()
                    .map(|(bidder_id, balance)| match balance {
                        Some(balance) => format!("{}={:.3}", bidder_id, balance),
                        None => format!("{}=n/a", bidder_id),
                    })
                    .collect();
                logln!(logger, LogEvent::Round, "Round {}: user {}, winner {} at {:.3}{}, balances [{}]",
                    result.round + 1,
                    result.user_id,
                    result.winner_id,
                    result.winning_price,
                    if result.clicked { " (clicked)" } else { "" },
                    formatted.join(", "));
            }

            results.push(result);
            balance_history.push(balances);
        }

        Ok(Self { results, balance_history })
    }
}

/// Statistics for a single bidder
#[derive(Debug, Clone, PartialEq)]
pub struct BidderStat {
    pub rounds_won: usize,
    pub clicks: usize,
    pub total_paid: f64,
    /// Sum of (click - price) over won rounds, recomputed from the round results
    pub recomputed_balance: f64,
    /// Balance as reported by the auction's settlement
    pub final_balance: Option<f64>,
}

/// Statistics over all bidders
#[derive(Debug, Clone, PartialEq)]
pub struct OverallStat {
    pub rounds: usize,
    pub clicks: usize,
    pub tie_rounds: usize,
    pub total_paid: f64,
}

/// Complete simulation statistics
pub struct SimulationStat {
    pub bidder_stats: Vec<BidderStat>,
    pub overall_stat: OverallStat,
}

impl SimulationStat {
    pub fn new(auction: &Auction, simulation_run: &SimulationRun) -> Self {
        let final_balances = auction.balances();
        let mut bidder_stats: Vec<BidderStat> = final_balances
            .into_iter()
            .map(|final_balance| BidderStat {
                rounds_won: 0,
                clicks: 0,
                total_paid: 0.0,
                recomputed_balance: 0.0,
                final_balance,
            })
            .collect();

        let mut overall_stat = OverallStat {
            rounds: simulation_run.results.len(),
            clicks: 0,
            tie_rounds: 0,
            total_paid: 0.0,
        };

        for result in &simulation_run.results {
            let bidder_stat = &mut bidder_stats[result.winner_id];
            bidder_stat.rounds_won += 1;
            bidder_stat.total_paid += result.winning_price;
            bidder_stat.recomputed_balance += result.winner_gain();
            overall_stat.total_paid += result.winning_price;
            if result.clicked {
                bidder_stat.clicks += 1;
                overall_stat.clicks += 1;
            }
            if result.is_tie() {
                overall_stat.tie_rounds += 1;
            }
        }

        Self {
            bidder_stats,
            overall_stat,
        }
    }

    /// Output per-bidder statistics
    pub fn printout_bidders(&self, auction: &Auction, logger: &mut Logger, event: LogEvent) {
        for (bidder_id, bidder_stat) in self.bidder_stats.iter().enumerate() {
            let bidder = &auction.bidders().bidders[bidder_id];
            let balance = match bidder_stat.final_balance {
                Some(balance) => format!("{:.3}", balance),
                None => "n/a".to_string(),
            };
            logln!(logger, event, "Bidder {} ({}) - {}: Balance = {}",
                bidder_id + 1, bidder.bidder_name(), bidder.get_bidding_type(), balance);
            logln!(logger, event, "  Rounds won: {}, clicks: {}, total paid: {:.3}",
                bidder_stat.rounds_won, bidder_stat.clicks, bidder_stat.total_paid);
        }
    }

    /// Output complete statistics
    pub fn printout(&self, auction: &Auction, logger: &mut Logger) {
        logln!(logger, LogEvent::Simulation, "\n=== Final Bidder Balances ({}) ===", auction.get_settlement_type());
        self.printout_bidders(auction, logger, LogEvent::Simulation);

        logln!(logger, LogEvent::Simulation, "\n=== Overall Statistics ===");
        logln!(logger, LogEvent::Simulation, "Users: {}, bidders: {}, rounds: {}",
            auction.users().len(), auction.bidders().len(), self.overall_stat.rounds);
        logln!(logger, LogEvent::Simulation, "Clicks: {}, tied rounds: {}, total paid: {:.3}",
            self.overall_stat.clicks, self.overall_stat.tie_rounds, self.overall_stat.total_paid);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::bidders::{BidderType, Bidders};
    use crate::settlement::SettlementType;
    use crate::users::Users;
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    fn prepare_auction(params: SimulationParams, bidder_type: BidderType, settlement_type: SettlementType) -> Auction {
        let users = Users::new(params.num_users, &mut StdRng::seed_from_u64(11));
        let mut bidders = Bidders::new();
        for i in 0..params.num_bidders {
            bidders.add(format!("Bidder {}", i + 1), bidder_type, params.num_users, params.num_rounds);
        }
        Auction::new(users, bidders, settlement_type, StdRng::seed_from_u64(12)).unwrap()
    }

    #[test]
    fn test_run_collects_every_round() {
        let params = SimulationParams { num_users: 7, num_bidders: 5, num_rounds: 10 };
        let mut auction = prepare_auction(params, BidderType::FIXED, SettlementType::AUCTION_LEDGER);
        let run = SimulationRun::new(&mut auction, params.num_rounds, &mut Logger::new()).unwrap();

        assert_eq!(run.results.len(), 10);
        assert_eq!(run.balance_history.len(), 10);
        assert_eq!(run.balance_history.last(), Some(&auction.balances()));
        assert!(run.results.iter().enumerate().all(|(i, r)| r.round == i));
    }

    #[test]
    fn test_fixed_bidders_always_tie_at_one() {
        let params = SimulationParams { num_users: 7, num_bidders: 5, num_rounds: 10 };
        let mut auction = prepare_auction(params, BidderType::FIXED, SettlementType::AUCTION_LEDGER);
        let run = SimulationRun::new(&mut auction, params.num_rounds, &mut Logger::new()).unwrap();
        let stat = SimulationStat::new(&auction, &run);

        assert_eq!(stat.overall_stat.tie_rounds, 10);
        assert_eq!(stat.overall_stat.total_paid, 10.0);
        let total_balance: f64 = stat.bidder_stats.iter().filter_map(|s| s.final_balance).sum();
        assert_eq!(total_balance, stat.overall_stat.clicks as f64 - 10.0);
    }

    #[test]
    fn test_stat_balance_matches_settlement() {
        let params = SimulationParams { num_users: 100, num_bidders: 20, num_rounds: 150 };
        let mut auction = prepare_auction(params, BidderType::ADAPTIVE, SettlementType::BIDDER_LEDGER);
        let run = SimulationRun::new(&mut auction, params.num_rounds, &mut Logger::new()).unwrap();
        let stat = SimulationStat::new(&auction, &run);

        for bidder_stat in &stat.bidder_stats {
            assert_eq!(bidder_stat.final_balance, Some(bidder_stat.recomputed_balance));
        }
        let rounds_won: usize = stat.bidder_stats.iter().map(|s| s.rounds_won).sum();
        assert_eq!(rounds_won, params.num_rounds);
    }

    #[test]
    fn test_adaptive_floor_after_debt() {
        let params = SimulationParams { num_users: 50, num_bidders: 10, num_rounds: 200 };
        let mut auction = prepare_auction(params, BidderType::ADAPTIVE, SettlementType::BIDDER_LEDGER);
        let run = SimulationRun::new(&mut auction, params.num_rounds, &mut Logger::new()).unwrap();

        for (round, balances) in run.balance_history.iter().enumerate().take(params.num_rounds - 1) {
            let next_bids = &run.results[round + 1].bids;
            for (bidder_id, balance) in balances.iter().enumerate() {
                if balance.is_some_and(|b| b < 0.0) {
                    assert_eq!(next_bids[bidder_id], 0.0);
                }
            }
        }
    }
}
