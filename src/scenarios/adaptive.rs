/// Main scenario: a population of adaptive bidders keeping their own balances.
///
/// 100 users, 20 adaptive bidders, 150 rounds.
///
/// It validates the adaptive strategy's contract against the round log:
/// - the opening round has every bidder bidding 1.0
/// - each bidder's own balance equals the sum of (click - price) over the rounds it won
/// - a bidder in debt after a round bids exactly 0.0 in the next one
/// - no bid ever exceeds the balance the bidder held going into the round, once it has history

use rand::{rngs::StdRng, SeedableRng};
use crate::auction::{Auction, AuctionError};
use crate::bidders::{BidderType, Bidders, OPENING_BID};
use crate::settlement::SettlementType;
use crate::simulationrun::{SimulationParams, SimulationRun, SimulationStat};
use crate::users::Users;
use crate::scenarios::Validation;
use crate::logger::{Logger, LogEvent};
use crate::logln;
use crate::utils::{get_seed, round_to_millis};

inventory::submit!(crate::scenarios::ScenarioEntry {
    short_name: "adaptive",
    run,
});

pub fn simulation_params() -> SimulationParams {
    SimulationParams {
        num_users: 100,
        num_bidders: 20,
        num_rounds: 150,
    }
}

pub fn prepare_auction(params: SimulationParams) -> Result<Auction, AuctionError> {
    let users = Users::new(params.num_users, &mut StdRng::seed_from_u64(get_seed(1991)));

    let mut bidders = Bidders::new();
    for i in 0..params.num_bidders {
        bidders.add(format!("Adaptive {}", i + 1), BidderType::ADAPTIVE, params.num_users, params.num_rounds);
    }

    Auction::new(users, bidders, SettlementType::BIDDER_LEDGER, StdRng::seed_from_u64(get_seed(2992)))
}

pub fn run(scenario_name: &str, logger: &mut Logger) -> Result<(), Box<dyn std::error::Error>> {
    let params = simulation_params();
    let mut auction = prepare_auction(params)?;
    logln!(logger, LogEvent::Simulation, "Initialized {} users, {} adaptive bidders, {} rounds",
        params.num_users, params.num_bidders, params.num_rounds);

    let simulation_run = SimulationRun::new(&mut auction, params.num_rounds, logger)?;
    let stats = SimulationStat::new(&auction, &simulation_run);
    stats.printout(&auction, logger);

    logln!(logger, LogEvent::Scenario, "");
    let mut validation = Validation::new();

    let opening_bids_ok = simulation_run.results.first()
        .map(|r| r.bids.iter().all(|&bid| bid == OPENING_BID))
        .unwrap_or(false);
    validation.check(logger, opening_bids_ok, format!(
        "Every bidder opens with {:.3}", OPENING_BID
    ));

    let mismatched: Vec<usize> = stats.bidder_stats.iter().enumerate()
        .filter(|(_, s)| s.final_balance != Some(s.recomputed_balance))
        .map(|(bidder_id, _)| bidder_id)
        .collect();
    validation.check(logger, mismatched.is_empty(), format!(
        "Bidder balances equal the sum of (click - price) over won rounds (mismatched bidders: {:?})",
        mismatched
    ));

    // balance_history[round] holds balances after that round, they drive the bids of round + 1
    let mut floor_violations = 0;
    let mut cap_violations = 0;
    for (round, balances) in simulation_run.balance_history.iter().enumerate() {
        let next_round = match simulation_run.results.get(round + 1) {
            Some(next_round) => next_round,
            None => break,
        };
        for (bidder_id, balance) in balances.iter().enumerate() {
            let balance = balance.unwrap_or(0.0);
            let next_bid = next_round.bids[bidder_id];
            if balance < 0.0 && next_bid != 0.0 {
                floor_violations += 1;
            }
            // Compared at bid precision, a capped bid is the balance rounded to 3 decimals
            if balance >= 0.0 && next_bid > round_to_millis(balance) {
                cap_violations += 1;
            }
        }
    }
    validation.check(logger, floor_violations == 0, format!(
        "Bidders in debt bid 0.000 in the following round: {} violations", floor_violations
    ));
    validation.check(logger, cap_violations == 0, format!(
        "Bids never exceed the bidder's balance: {} violations", cap_violations
    ));

    let profitable = stats.bidder_stats.iter()
        .filter(|s| s.final_balance.is_some_and(|b| b > 0.0))
        .count();
    logln!(logger, LogEvent::Scenario, "Bidders ending with a profit: {} / {}", profitable, params.num_bidders);

    validation.finish(scenario_name)
}
