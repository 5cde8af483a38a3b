/// Fixed and adaptive bidders competing in one auction that keeps its own ledger.
///
/// 50 users, 5 fixed + 5 adaptive bidders, 200 rounds.
///
/// The adaptive bidders also settle their own balance in notify(), so the auction's ledger and the
/// bidders' books must agree to the last bit. It validates:
/// - auction ledger and adaptive bidders' own balances are identical
/// - with fixed bidders at 1.0 in the auction the winning price never drops below 1.0

use rand::{rngs::StdRng, SeedableRng};
use crate::auction::{Auction, AuctionError};
use crate::bidders::{BidderType, Bidders, OPENING_BID};
use crate::settlement::SettlementType;
use crate::simulationrun::{SimulationParams, SimulationRun, SimulationStat};
use crate::users::Users;
use crate::scenarios::Validation;
use crate::logger::{Logger, LogEvent};
use crate::logln;
use crate::utils::get_seed;

inventory::submit!(crate::scenarios::ScenarioEntry {
    short_name: "mixed",
    run,
});

pub fn simulation_params() -> SimulationParams {
    SimulationParams {
        num_users: 50,
        num_bidders: 10,
        num_rounds: 200,
    }
}

/// First half of the bidders is fixed, second half adaptive
pub fn prepare_auction(params: SimulationParams) -> Result<Auction, AuctionError> {
    let users = Users::new(params.num_users, &mut StdRng::seed_from_u64(get_seed(1991)));

    let mut bidders = Bidders::new();
    let num_fixed = params.num_bidders / 2;
    for i in 0..params.num_bidders {
        if i < num_fixed {
            bidders.add(format!("Fixed {}", i + 1), BidderType::FIXED, params.num_users, params.num_rounds);
        } else {
            bidders.add(format!("Adaptive {}", i + 1 - num_fixed), BidderType::ADAPTIVE, params.num_users, params.num_rounds);
        }
    }

    Auction::new(users, bidders, SettlementType::AUCTION_LEDGER, StdRng::seed_from_u64(get_seed(2992)))
}

pub fn run(scenario_name: &str, logger: &mut Logger) -> Result<(), Box<dyn std::error::Error>> {
    let params = simulation_params();
    let mut auction = prepare_auction(params)?;
    logln!(logger, LogEvent::Simulation, "Initialized {} users, {} bidders (fixed and adaptive), {} rounds",
        params.num_users, params.num_bidders, params.num_rounds);

    let simulation_run = SimulationRun::new(&mut auction, params.num_rounds, logger)?;
    let stats = SimulationStat::new(&auction, &simulation_run);
    stats.printout(&auction, logger);

    logln!(logger, LogEvent::Scenario, "");
    let mut validation = Validation::new();

    let ledger = auction.balances();
    let mut compared = 0;
    let mut disagreements = 0;
    for (bidder, ledger_balance) in auction.bidders().bidders.iter().zip(ledger.iter()) {
        if let Some(own_balance) = bidder.balance() {
            compared += 1;
            if Some(own_balance) != *ledger_balance {
                disagreements += 1;
            }
        }
    }
    validation.check(logger, compared > 0 && disagreements == 0, format!(
        "Auction ledger agrees with adaptive bidders' own balances: {} of {} disagree",
        disagreements, compared
    ));

    let lowest_price = simulation_run.results.iter()
        .map(|r| r.winning_price)
        .fold(f64::INFINITY, f64::min);
    validation.check(logger, lowest_price >= OPENING_BID, format!(
        "Winning price never drops below the fixed bid: lowest {:.3} >= {:.3}",
        lowest_price, OPENING_BID
    ));

    let adaptive_wins: usize = stats.bidder_stats.iter().skip(params.num_bidders / 2).map(|s| s.rounds_won).sum();
    logln!(logger, LogEvent::Scenario, "Rounds won by adaptive bidders: {} / {}", adaptive_wins, params.num_rounds);

    validation.finish(scenario_name)
}
