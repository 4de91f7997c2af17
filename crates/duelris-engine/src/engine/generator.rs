use std::{collections::VecDeque, fmt, str::FromStr};

use arrayvec::ArrayVec;
use rand::{
    Rng, SeedableRng as _,
    distr::{Distribution, StandardUniform},
    seq::SliceRandom,
};
use rand_pcg::Pcg32;
use serde::{Deserialize, Deserializer, Serialize, Serializer};

use crate::{Piece, PieceKind};

/// Seed for deterministic piece generation.
///
/// 128 bits, serialized as a 32-character hex string. Boards built from the
/// same seed and rules see the same pieces and the same garbage holes.
///
/// # Example
///
/// ```
/// use duelris_engine::PieceSeed;
/// use rand::Rng as _;
///
/// let random: PieceSeed = rand::rng().random();
/// let fixed = PieceSeed::from(42);
/// assert_eq!(fixed.to_string(), "0000000000000000000000000000002a");
/// # let _ = random;
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct PieceSeed([u8; 16]);

impl PieceSeed {
    #[must_use]
    pub const fn from_bytes(bytes: [u8; 16]) -> Self {
        Self(bytes)
    }

    #[must_use]
    pub const fn as_bytes(&self) -> &[u8; 16] {
        &self.0
    }
}

impl From<u64> for PieceSeed {
    fn from(value: u64) -> Self {
        Self(u128::from(value).to_be_bytes())
    }
}

impl fmt::Display for PieceSeed {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:032x}", u128::from_be_bytes(self.0))
    }
}

#[derive(Debug, Clone, PartialEq, Eq, derive_more::Display, derive_more::Error)]
#[display("invalid seed '{input}': expected 32 hex characters")]
pub struct ParseSeedError {
    #[error(not(source))]
    input: String,
}

impl FromStr for PieceSeed {
    type Err = ParseSeedError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let invalid = || ParseSeedError {
            input: s.to_owned(),
        };
        if s.len() != 32 || !s.bytes().all(|b| b.is_ascii_hexdigit()) {
            return Err(invalid());
        }
        let num = u128::from_str_radix(s, 16).map_err(|_| invalid())?;
        Ok(Self(num.to_be_bytes()))
    }
}

impl Serialize for PieceSeed {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

impl<'de> Deserialize<'de> for PieceSeed {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let s = String::deserialize(deserializer)?;
        s.parse().map_err(serde::de::Error::custom)
    }
}

impl Distribution<PieceSeed> for StandardUniform {
    fn sample<R: Rng + ?Sized>(&self, rng: &mut R) -> PieceSeed {
        let mut seed = [0; 16];
        rng.fill(&mut seed);
        PieceSeed(seed)
    }
}

/// A piece selection policy.
///
/// Policies only decide which kind comes next; the random source is owned
/// by [`PieceGenerator`] and handed in on every draw.
pub trait Randomizer: fmt::Debug + Send + Sync {
    /// Chooses the next piece kind.
    fn draw(&mut self, rng: &mut Pcg32) -> PieceKind;

    /// Forgets all internal state, as at construction.
    fn reset(&mut self);

    fn boxed_clone(&self) -> Box<dyn Randomizer>;
}

impl Clone for Box<dyn Randomizer> {
    fn clone(&self) -> Self {
        self.boxed_clone()
    }
}

/// Built-in randomizers selectable from a rule file.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RandomizerKind {
    #[default]
    Bag,
    History,
}

impl RandomizerKind {
    #[must_use]
    pub fn build(self) -> Box<dyn Randomizer> {
        match self {
            RandomizerKind::Bag => Box::new(BagRandomizer::default()),
            RandomizerKind::History => Box::new(HistoryRandomizer::default()),
        }
    }
}

/// Deals all seven kinds in shuffled order, then reshuffles a fresh set.
#[derive(Debug, Default, Clone)]
pub struct BagRandomizer {
    bag: ArrayVec<PieceKind, { PieceKind::LEN }>,
}

impl Randomizer for BagRandomizer {
    fn draw(&mut self, rng: &mut Pcg32) -> PieceKind {
        if self.bag.is_empty() {
            self.bag.extend(PieceKind::ALL);
            self.bag.shuffle(rng);
        }
        // Refilled above when empty
        self.bag.pop().unwrap_or(PieceKind::I)
    }

    fn reset(&mut self) {
        self.bag.clear();
    }

    fn boxed_clone(&self) -> Box<dyn Randomizer> {
        Box::new(self.clone())
    }
}

/// Uniform draws that never deal the same kind three times in a row.
#[derive(Debug, Default, Clone)]
pub struct HistoryRandomizer {
    last: [Option<PieceKind>; 2],
}

impl Randomizer for HistoryRandomizer {
    fn draw(&mut self, rng: &mut Pcg32) -> PieceKind {
        let excluded = match self.last {
            [Some(a), Some(b)] if a == b => Some(a),
            _ => None,
        };
        let candidates: ArrayVec<PieceKind, { PieceKind::LEN }> = PieceKind::ALL
            .into_iter()
            .filter(|kind| Some(*kind) != excluded)
            .collect();
        let kind = if candidates.is_empty() {
            rng.random()
        } else {
            candidates[rng.random_range(0..candidates.len())]
        };
        self.last = [self.last[1], Some(kind)];
        kind
    }

    fn reset(&mut self) {
        self.last = [None; 2];
    }

    fn boxed_clone(&self) -> Box<dyn Randomizer> {
        Box::new(self.clone())
    }
}

/// Repeats a fixed list of kinds. Used for scripted games and drills.
#[derive(Debug, Clone)]
pub struct SequenceRandomizer {
    kinds: Vec<PieceKind>,
    index: usize,
}

impl SequenceRandomizer {
    /// # Panics
    ///
    /// Panics if `kinds` is empty.
    #[must_use]
    pub fn new(kinds: impl IntoIterator<Item = PieceKind>) -> Self {
        let kinds: Vec<_> = kinds.into_iter().collect();
        assert!(!kinds.is_empty(), "sequence must not be empty");
        Self { kinds, index: 0 }
    }
}

impl Randomizer for SequenceRandomizer {
    fn draw(&mut self, _rng: &mut Pcg32) -> PieceKind {
        let kind = self.kinds[self.index % self.kinds.len()];
        self.index = (self.index + 1) % self.kinds.len();
        kind
    }

    fn reset(&mut self) {
        self.index = 0;
    }

    fn boxed_clone(&self) -> Box<dyn Randomizer> {
        Box::new(self.clone())
    }
}

/// Produces spawn-ready pieces and keeps a preview buffer.
///
/// `next` consumes a piece; `peek` never does. The buffer is topped up
/// eagerly, so the first `lookahead` upcoming kinds are always available
/// without mutation.
///
/// # Example
///
/// ```
/// use duelris_engine::{PieceGenerator, PieceSeed, RandomizerKind};
///
/// let mut generator = PieceGenerator::new(RandomizerKind::Bag.build(), PieceSeed::from(7), 3, 0);
/// let upcoming = generator.peek(3);
/// assert_eq!(generator.next(), upcoming[0]);
/// ```
#[derive(Debug, Clone)]
pub struct PieceGenerator {
    randomizer: Box<dyn Randomizer>,
    rng: Pcg32,
    queue: VecDeque<PieceKind>,
    lookahead: usize,
    spawn_row: i8,
}

impl PieceGenerator {
    #[must_use]
    pub fn new(
        randomizer: Box<dyn Randomizer>,
        seed: PieceSeed,
        lookahead: usize,
        spawn_row: i8,
    ) -> Self {
        let mut this = Self {
            randomizer,
            rng: Pcg32::from_seed(seed.0),
            queue: VecDeque::with_capacity(lookahead + 1),
            lookahead: lookahead.max(1),
            spawn_row,
        };
        this.fill_queue(this.lookahead);
        this
    }

    /// Restarts the sequence from `seed` with a fresh randomizer state.
    pub fn reseed(&mut self, seed: PieceSeed) {
        self.rng = Pcg32::from_seed(seed.0);
        self.randomizer.reset();
        self.queue.clear();
        self.fill_queue(self.lookahead);
    }

    fn fill_queue(&mut self, len: usize) {
        while self.queue.len() < len {
            let kind = self.randomizer.draw(&mut self.rng);
            self.queue.push_back(kind);
        }
    }

    /// Removes and returns the next piece, positioned for spawning.
    pub fn next(&mut self) -> Piece {
        self.fill_queue(self.lookahead + 1);
        let kind = self.queue.pop_front().unwrap_or(PieceKind::I);
        Piece::spawn(kind, self.spawn_row)
    }

    /// Returns the next `n` pieces without consuming them.
    pub fn peek(&mut self, n: usize) -> Vec<Piece> {
        self.fill_queue(n);
        self.queue
            .iter()
            .take(n)
            .map(|&kind| Piece::spawn(kind, self.spawn_row))
            .collect()
    }

    /// Upcoming kinds in the preview window.
    pub fn preview(&self) -> impl Iterator<Item = PieceKind> + '_ {
        self.queue.iter().copied().take(self.lookahead)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn draw_kinds(randomizer: &mut dyn Randomizer, rng: &mut Pcg32, n: usize) -> Vec<PieceKind> {
        (0..n).map(|_| randomizer.draw(rng)).collect()
    }

    #[test]
    fn bag_deals_every_kind_once_per_bag() {
        let mut rng = Pcg32::from_seed(PieceSeed::from(1).0);
        let mut bag = BagRandomizer::default();
        let kinds = draw_kinds(&mut bag, &mut rng, PieceKind::LEN * 50);
        for chunk in kinds.chunks(PieceKind::LEN) {
            for kind in PieceKind::ALL {
                assert_eq!(chunk.iter().filter(|k| **k == kind).count(), 1);
            }
        }
    }

    #[test]
    fn history_never_deals_three_in_a_row() {
        let mut rng = Pcg32::from_seed(PieceSeed::from(2).0);
        let mut history = HistoryRandomizer::default();
        let kinds = draw_kinds(&mut history, &mut rng, 10_000);
        assert!(kinds.windows(3).all(|w| !(w[0] == w[1] && w[1] == w[2])));
        for kind in PieceKind::ALL {
            assert!(kinds.contains(&kind));
        }
    }

    #[test]
    fn sequence_cycles() {
        let mut rng = Pcg32::from_seed(PieceSeed::from(3).0);
        let mut sequence = SequenceRandomizer::new([PieceKind::T, PieceKind::I]);
        let kinds = draw_kinds(&mut sequence, &mut rng, 5);
        assert_eq!(
            kinds,
            [PieceKind::T, PieceKind::I, PieceKind::T, PieceKind::I, PieceKind::T]
        );
    }

    #[test]
    fn peek_does_not_consume() {
        let mut generator =
            PieceGenerator::new(RandomizerKind::History.build(), PieceSeed::from(4), 1, -1);
        let peeked = generator.peek(5);
        assert_eq!(generator.peek(5), peeked);
        for expected in peeked {
            assert_eq!(generator.next(), expected);
        }
    }

    #[test]
    fn pieces_come_out_spawn_ready() {
        let mut generator = PieceGenerator::new(
            Box::new(SequenceRandomizer::new([PieceKind::O, PieceKind::L])),
            PieceSeed::from(5),
            1,
            -1,
        );
        assert_eq!(generator.next(), Piece::spawn(PieceKind::O, -1));
        assert_eq!(generator.next(), Piece::new(PieceKind::L, 0, 3, -1));
    }

    #[test]
    fn same_seed_same_sequence() {
        let seed = PieceSeed::from(0x1234_5678);
        let mut a = PieceGenerator::new(RandomizerKind::Bag.build(), seed, 3, 0);
        let mut b = PieceGenerator::new(RandomizerKind::Bag.build(), seed, 3, 0);
        for _ in 0..50 {
            assert_eq!(a.next(), b.next());
        }
    }

    #[test]
    fn reseed_restarts_sequence() {
        let seed = PieceSeed::from(99);
        let mut generator = PieceGenerator::new(RandomizerKind::Bag.build(), seed, 3, 0);
        let first: Vec<_> = (0..10).map(|_| generator.next()).collect();
        generator.reseed(seed);
        let second: Vec<_> = (0..10).map(|_| generator.next()).collect();
        assert_eq!(first, second);
    }

    #[test]
    fn preview_window_is_bounded() {
        let mut generator =
            PieceGenerator::new(RandomizerKind::Bag.build(), PieceSeed::from(6), 3, 0);
        let _ = generator.peek(6);
        assert_eq!(generator.preview().count(), 3);
    }

    #[test]
    fn seeds_are_hex_strings() {
        let seed = PieceSeed::from(0xdead_beef);
        assert_eq!(
            serde_json::to_value(seed).unwrap(),
            "000000000000000000000000deadbeef"
        );
        let upper: PieceSeed = "000000000000000000000000DEADBEEF".parse().unwrap();
        assert_eq!(upper, seed);

        let random: PieceSeed = rand::rng().random();
        assert_eq!(random.to_string().parse::<PieceSeed>().unwrap(), random);
    }

    #[test]
    fn malformed_seeds_are_rejected() {
        let too_short = "f".repeat(31);
        let too_long = "f".repeat(33);
        let signed = format!("+{}", "f".repeat(31));
        let not_hex = "z".repeat(32);
        for input in [too_short.as_str(), too_long.as_str(), signed.as_str(), not_hex.as_str(), ""] {
            let err = input.parse::<PieceSeed>().unwrap_err();
            assert!(err.to_string().starts_with("invalid seed"), "{err}");
        }
        assert!(serde_json::from_str::<PieceSeed>("42").is_err());
    }
}
