// Settlement decides who keeps the books. Either the auction holds a ledger of its own
// (bidders may be stateless), or the bidders settle inside notify() and the auction only reads
// their balances back. Both satisfy the same balance law, they only differ in where it lives.

use crate::bidder::BidderTrait;

/// Trait for the balance bookkeeping strategy of an auction
pub trait SettlementTrait {
    /// Record the outcome of a round for its winner
    fn settle(&mut self, winner_id: usize, clicked: bool, price: f64);

    /// Balance of the bidder with the given id
    /// Returns None when nobody keeps a balance for this bidder
    fn balance(&self, bidder_id: usize, bidder: &dyn BidderTrait) -> Option<f64>;

    /// Get a string representation of the settlement type
    fn get_settlement_type(&self) -> String;
}

/// Settlement type selecting where balances are kept
#[allow(non_camel_case_types)]
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum SettlementType {
    AUCTION_LEDGER,
    BIDDER_LEDGER,
}

/// The auction keeps one balance per bidder
pub struct SettlementAuctionLedger {
    pub balances: Vec<f64>,
}

impl SettlementAuctionLedger {
    pub fn new(num_bidders: usize) -> Self {
        Self {
            balances: vec![0.0; num_bidders],
        }
    }
}

impl SettlementTrait for SettlementAuctionLedger {
    fn settle(&mut self, winner_id: usize, clicked: bool, price: f64) {
        let gain = if clicked { 1.0 } else { 0.0 };
        self.balances[winner_id] += gain - price;
    }

    fn balance(&self, bidder_id: usize, _bidder: &dyn BidderTrait) -> Option<f64> {
        self.balances.get(bidder_id).copied()
    }

    fn get_settlement_type(&self) -> String {
        "Auction ledger".to_string()
    }
}

/// Bidders settle their own balance in notify(), nothing to do on the auction side
pub struct SettlementBidderLedger;

impl SettlementTrait for SettlementBidderLedger {
    fn settle(&mut self, _winner_id: usize, _clicked: bool, _price: f64) {}

    fn balance(&self, _bidder_id: usize, bidder: &dyn BidderTrait) -> Option<f64> {
        bidder.balance()
    }

    fn get_settlement_type(&self) -> String {
        "Bidder ledger".to_string()
    }
}

/// Create the settlement strategy for the given type and population size
pub fn create_settlement(settlement_type: SettlementType, num_bidders: usize) -> Box<dyn SettlementTrait> {
    match settlement_type {
        SettlementType::AUCTION_LEDGER => Box::new(SettlementAuctionLedger::new(num_bidders)),
        SettlementType::BIDDER_LEDGER => Box::new(SettlementBidderLedger),
    }
}
