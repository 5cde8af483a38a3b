use rand::rngs::StdRng;
use rand::Rng;
use rand_distr::{Distribution, Uniform};

/// A simulated website visitor
/// The click probability is fixed at creation and never leaves this struct, bidders can only learn it
/// from the outcome of observe_click
#[derive(Debug, Clone)]
pub struct User {
    click_probability: f64,
}

impl User {
    /// Create a user with a click probability drawn uniformly from [0, 1)
    pub fn new(rng: &mut StdRng) -> Self {
        let click_probability = Uniform::new(0.0, 1.0).sample(rng);
        Self { click_probability }
    }

    /// Show the ad to the user, returns true if the user clicked
    /// Every call is an independent Bernoulli trial
    pub fn observe_click(&self, rng: &mut StdRng) -> bool {
        rng.gen::<f64>() < self.click_probability
    }

    #[cfg(test)]
    pub fn with_click_probability(click_probability: f64) -> Self {
        Self { click_probability }
    }
}

/// Fixed population of users, the index in the vector is the user_id shown to bidders
pub struct Users {
    pub users: Vec<User>,
}

impl Users {
    pub fn new(num_users: usize, rng: &mut StdRng) -> Self {
        let users = (0..num_users).map(|_| User::new(rng)).collect();
        Self { users }
    }

    pub fn len(&self) -> usize {
        self.users.len()
    }

    pub fn is_empty(&self) -> bool {
        self.users.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::SeedableRng;

    fn click_rate(user: &User, trials: usize, rng: &mut StdRng) -> f64 {
        let clicks = (0..trials).filter(|_| user.observe_click(rng)).count();
        clicks as f64 / trials as f64
    }

    #[test]
    fn test_click_rate_converges_to_probability() {
        let mut rng = StdRng::seed_from_u64(42);
        for p in [0.1, 0.35, 0.5, 0.8] {
            let user = User::with_click_probability(p);
            let rate = click_rate(&user, 100_000, &mut rng);
            // Standard deviation at 100k trials is below 0.0016, so 0.01 is a wide band
            assert!((rate - p).abs() < 0.01, "p = {}, observed rate = {}", p, rate);
        }
    }

    #[test]
    fn test_zero_probability_never_clicks() {
        let mut rng = StdRng::seed_from_u64(7);
        let user = User::with_click_probability(0.0);
        assert!((0..10_000).all(|_| !user.observe_click(&mut rng)));
    }

    #[test]
    fn test_generated_probabilities_are_in_range() {
        let mut rng = StdRng::seed_from_u64(1991);
        let users = Users::new(1000, &mut rng);
        assert_eq!(users.len(), 1000);
        assert!(users.users.iter().all(|u| (0.0..1.0).contains(&u.click_probability)));

        // Uniform over [0, 1) averages close to 0.5
        let mean: f64 = users.users.iter().map(|u| u.click_probability).sum::<f64>() / 1000.0;
        assert!((mean - 0.5).abs() < 0.05, "mean probability = {}", mean);
    }

    #[test]
    fn test_same_seed_same_population() {
        let a = Users::new(10, &mut StdRng::seed_from_u64(3));
        let b = Users::new(10, &mut StdRng::seed_from_u64(3));
        let pa: Vec<f64> = a.users.iter().map(|u| u.click_probability).collect();
        let pb: Vec<f64> = b.users.iter().map(|u| u.click_probability).collect();
        assert_eq!(pa, pb);
    }
}
