use crate::config::SearchConfig;
use crate::error::SearchError;
use crate::index::{Term, TermIndex};
use crate::similarity::SimilarityMatrix;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use rayon::prelude::*;
use serde::Serialize;
use std::cmp::Ordering;
use std::collections::{BTreeMap, HashMap};

pub const DEFAULT_CYCLES: usize = 50;
pub const DEFAULT_DECAY_RATE: f64 = 0.2;
pub const DEFAULT_BETA: f64 = 1.0;
pub const DEFAULT_INITIAL_PHEROMONE: f64 = 0.2;
pub const DEFAULT_EXPLORE_EXPLOIT: f64 = 0.7;

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct SearchParams {
    pub agents: usize,
    pub subset_size: usize,
    pub cycles: usize,
    pub decay_rate: f64,
    pub beta: f64,
    pub initial_pheromone: f64,
    pub explore_exploit: f64,
}

impl SearchParams {
    pub fn new(agents: usize, subset_size: usize) -> Self {
        Self {
            agents,
            subset_size,
            cycles: DEFAULT_CYCLES,
            decay_rate: DEFAULT_DECAY_RATE,
            beta: DEFAULT_BETA,
            initial_pheromone: DEFAULT_INITIAL_PHEROMONE,
            explore_exploit: DEFAULT_EXPLORE_EXPLOIT,
        }
    }

    pub fn from_config(config: &SearchConfig) -> Self {
        let defaults = Self::new(config.number_ants, config.number_features);
        Self {
            cycles: config.number_cycles.unwrap_or(defaults.cycles),
            decay_rate: config.decay_rate.unwrap_or(defaults.decay_rate),
            beta: config.beta.unwrap_or(defaults.beta),
            initial_pheromone: config.initial_pheromone.unwrap_or(defaults.initial_pheromone),
            explore_exploit: config.explore_exploit_coeff.unwrap_or(defaults.explore_exploit),
            ..defaults
        }
    }

    /// Out-of-range rates and a negative (or NaN) beta fall back to their
    /// defaults; the subset size is capped by the number of terms.
    fn sanitized(self, term_count: usize) -> Self {
        Self {
            subset_size: self.subset_size.min(term_count),
            decay_rate: unit_or(self.decay_rate, DEFAULT_DECAY_RATE),
            beta: if self.beta >= 0.0 { self.beta } else { DEFAULT_BETA },
            explore_exploit: unit_or(self.explore_exploit, DEFAULT_EXPLORE_EXPLOIT),
            ..self
        }
    }
}

fn unit_or(value: f64, default: f64) -> f64 {
    if (0.0..=1.0).contains(&value) { value } else { default }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SearchState {
    Uninitialized,
    PheromoneInitialized,
    Converged,
}

/// Visits made during one cycle, indexed by canonical term position.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct CycleCounts {
    pub visits: Vec<u32>,
    pub total: u64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CycleRecord {
    pub cycle: usize,
    pub visits: BTreeMap<Term, u32>,
    pub total_visits: u64,
}

/// Unsupervised feature selection with ant colony optimization.
///
/// Every cycle places `agents` ants on distinct random terms. Each ant walks
/// up to `subset_size` unvisited terms, scoring each candidate `u` as
/// `pheromone[u] * similarity(current, u)^beta` and moving greedily with
/// probability `explore_exploit`, otherwise to the highest normalized score.
/// Ants read the pheromone table frozen at the start of the cycle; afterwards
/// every term decays by `1 - decay_rate` and gains its share of the visits.
pub struct Ufsaco<'a> {
    terms: &'a [Term],
    adjacency: Vec<Vec<(usize, f64)>>,
    params: SearchParams,
    pheromone: Vec<f64>,
    history: Vec<CycleRecord>,
    state: SearchState,
    index_loaded: bool,
}

impl<'a> Ufsaco<'a> {
    pub fn new(index: &'a TermIndex, similarity: &SimilarityMatrix, params: SearchParams) -> Self {
        let terms = index.term_universe();
        Self {
            terms,
            adjacency: similarity.adjacency(terms),
            params: params.sanitized(terms.len()),
            pheromone: Vec::new(),
            history: Vec::new(),
            state: SearchState::Uninitialized,
            index_loaded: true,
        }
    }

    /// Engine for an index that could not be loaded; every operation is a no-op
    /// and `search_subset` reports `false`. For library callers that keep going
    /// without an index; the selector binary stops before searching instead.
    pub fn unloaded(params: SearchParams) -> Ufsaco<'static> {
        Ufsaco {
            terms: &[],
            adjacency: Vec::new(),
            params: params.sanitized(0),
            pheromone: Vec::new(),
            history: Vec::new(),
            state: SearchState::Uninitialized,
            index_loaded: false,
        }
    }

    pub fn is_index_loaded(&self) -> bool { self.index_loaded }

    pub fn params(&self) -> &SearchParams { &self.params }

    pub fn state(&self) -> SearchState { self.state }

    pub fn history(&self) -> &[CycleRecord] { &self.history }

    pub fn init_pheromone(&mut self) {
        if !self.index_loaded {
            return;
        }
        tracing::debug!(terms = self.terms.len(), value = self.params.initial_pheromone, "initializing pheromone");
        self.pheromone = vec![self.params.initial_pheromone; self.terms.len()];
        self.history.clear();
        self.state = SearchState::PheromoneInitialized;
    }

    fn check_agents(&self) -> Result<(), SearchError> {
        if self.params.agents > self.terms.len() {
            return Err(SearchError::TooManyAgents { agents: self.params.agents, terms: self.terms.len() });
        }
        Ok(())
    }

    /// Run one cycle against the current pheromone table without modifying it.
    pub fn run_cycle<R: Rng + ?Sized>(&self, rng: &mut R) -> Result<CycleCounts, SearchError> {
        self.check_agents()?;
        let n = self.terms.len();
        let starts = rand::seq::index::sample(rng, n, self.params.agents).into_vec();
        let seeds: Vec<u64> = starts.iter().map(|_| rng.gen()).collect();

        let paths: Vec<Vec<usize>> = starts
            .par_iter()
            .zip(seeds.par_iter())
            .map(|(&start, &seed)| self.walk(start, seed))
            .collect();

        let mut counts = CycleCounts { visits: vec![0; n], total: 0 };
        for path in paths {
            for term in path {
                counts.visits[term] += 1;
                counts.total += 1;
            }
        }
        Ok(counts)
    }

    /// Terms one agent moves to, in order, starting from `start`.
    fn walk(&self, start: usize, seed: u64) -> Vec<usize> {
        let mut rng = StdRng::seed_from_u64(seed);
        let mut visited = vec![false; self.terms.len()];
        visited[start] = true;
        let mut current = start;
        let mut path = Vec::with_capacity(self.params.subset_size);

        for _ in 0..self.params.subset_size {
            let mut candidates: Vec<(usize, f64)> = Vec::new();
            let mut total = 0.0;
            let mut best: Option<usize> = None;
            let mut best_value = 0.0;
            let mut score = |u: usize, sim: f64| {
                let h = self.pheromone[u] * sim.powf(self.params.beta);
                if h > 0.0 {
                    candidates.push((u, h));
                    total += h;
                    if h > best_value {
                        best_value = h;
                        best = Some(u);
                    }
                }
            };
            if self.params.beta > 0.0 {
                // unrelated terms score 0, only stored neighbours can win
                for &(u, sim) in &self.adjacency[current] {
                    if !visited[u] {
                        score(u, sim);
                    }
                }
            } else {
                // similarity^0 is 1 for every term, related or not
                for u in (0..self.terms.len()).filter(|&u| !visited[u]) {
                    score(u, self.stored_similarity(current, u));
                }
            }

            let r: f64 = rng.gen();
            let next = if r <= self.params.explore_exploit { best } else { most_probable(&candidates, total) };
            match next {
                Some(u) => {
                    visited[u] = true;
                    current = u;
                    path.push(u);
                }
                // stalled: nothing reachable from here
                None => break,
            }
        }
        path
    }

    fn stored_similarity(&self, from: usize, to: usize) -> f64 {
        let row = &self.adjacency[from];
        row.binary_search_by_key(&to, |&(j, _)| j).map(|k| row[k].1).unwrap_or(0.0)
    }

    /// Global update over the whole term universe.
    pub fn update_pheromone(&mut self, cycle: usize, counts: CycleCounts) {
        if !self.index_loaded {
            return;
        }
        let decay = 1.0 - self.params.decay_rate;
        for (term, value) in self.pheromone.iter_mut().enumerate() {
            let mut next = decay * *value;
            if counts.total > 0 {
                next += f64::from(counts.visits.get(term).copied().unwrap_or(0)) / counts.total as f64;
            }
            *value = next;
        }

        let visits = counts
            .visits
            .iter()
            .enumerate()
            .filter(|(_, c)| **c > 0)
            .map(|(i, c)| (self.terms[i].clone(), *c))
            .collect();
        self.history.push(CycleRecord { cycle, visits, total_visits: counts.total });
    }

    /// Full run: initialize pheromone then execute every cycle. Returns `false`
    /// without doing anything when the index is not loaded.
    pub fn search_subset<R: Rng + ?Sized>(&mut self, rng: &mut R) -> Result<bool, SearchError> {
        if !self.index_loaded {
            tracing::warn!("index not loaded, skipping feature search");
            return Ok(false);
        }
        self.check_agents()?;
        self.init_pheromone();
        for cycle in 0..self.params.cycles {
            let counts = self.run_cycle(rng)?;
            tracing::debug!(cycle = cycle + 1, visits = counts.total, "cycle complete");
            self.update_pheromone(cycle, counts);
        }
        self.state = SearchState::Converged;
        tracing::info!(cycles = self.params.cycles, agents = self.params.agents, "feature search converged");
        Ok(true)
    }

    pub fn search_subset_seeded(&mut self, seed: u64) -> Result<bool, SearchError> {
        let mut rng = StdRng::seed_from_u64(seed);
        self.search_subset(&mut rng)
    }

    pub fn pheromone(&self, term: &str) -> Option<f64> {
        let i = self.terms.iter().position(|t| t == term)?;
        self.pheromone.get(i).copied()
    }

    pub fn pheromone_table(&self) -> HashMap<Term, f64> {
        self.terms.iter().cloned().zip(self.pheromone.iter().copied()).collect()
    }

    /// Top `top_n` terms with their pheromone, highest first; ties keep the
    /// canonical term order.
    pub fn scored_feature_results(&self, top_n: usize) -> Vec<(Term, f64)> {
        let mut order: Vec<usize> = (0..self.pheromone.len()).collect();
        order.sort_by(|a, b| self.pheromone[*b].partial_cmp(&self.pheromone[*a]).unwrap_or(Ordering::Equal));
        order
            .into_iter()
            .take(top_n)
            .map(|i| (self.terms[i].clone(), self.pheromone[i]))
            .collect()
    }

    pub fn feature_results(&self, top_n: usize) -> Vec<Term> {
        self.scored_feature_results(top_n).into_iter().map(|(t, _)| t).collect()
    }
}

/// Candidate with the highest share of the summed heuristic.
fn most_probable(candidates: &[(usize, f64)], total: f64) -> Option<usize> {
    let mut best = None;
    let mut best_prob = 0.0;
    for &(u, h) in candidates {
        let prob = h / total;
        if prob > best_prob {
            best_prob = prob;
            best = Some(u);
        }
    }
    best
}

#[cfg(test)]
mod tests {
    use super::*;

    fn corpus() -> TermIndex {
        let mut index = TermIndex::new();
        index.ingest("d1", ["a", "b", "c"], "x");
        index.ingest("d2", ["b", "c", "d", "d"], "x");
        index.ingest("d3", ["d", "e", "a"], "y");
        index.ingest("d4", ["z"], "y");
        index
    }

    fn params() -> SearchParams {
        SearchParams { cycles: 5, ..SearchParams::new(2, 3) }
    }

    #[test]
    fn invalid_rates_fall_back_to_defaults() {
        let p = SearchParams { decay_rate: 1.5, explore_exploit: -0.1, ..SearchParams::new(1, 100) }.sanitized(6);
        assert_eq!(p.decay_rate, DEFAULT_DECAY_RATE);
        assert_eq!(p.explore_exploit, DEFAULT_EXPLORE_EXPLOIT);
        assert_eq!(p.subset_size, 6);
        let nan = SearchParams { decay_rate: f64::NAN, ..SearchParams::new(1, 1) }.sanitized(6);
        assert_eq!(nan.decay_rate, DEFAULT_DECAY_RATE);
    }

    #[test]
    fn negative_beta_falls_back_to_default() {
        let p = SearchParams { beta: -1.0, ..SearchParams::new(1, 1) }.sanitized(6);
        assert_eq!(p.beta, DEFAULT_BETA);
        let nan = SearchParams { beta: f64::NAN, ..SearchParams::new(1, 1) }.sanitized(6);
        assert_eq!(nan.beta, DEFAULT_BETA);
        let zero = SearchParams { beta: 0.0, ..SearchParams::new(1, 1) }.sanitized(6);
        assert_eq!(zero.beta, 0.0);
    }

    #[test]
    fn zero_beta_reaches_unrelated_terms() {
        let mut index = TermIndex::new();
        index.ingest("d1", ["a"], "x");
        index.ingest("d2", ["b"], "x");
        index.ingest("d3", ["c"], "y");
        let similarity = SimilarityMatrix::compute_all(&index);
        assert!(similarity.is_empty());

        let mut engine = Ufsaco::new(&index, &similarity, SearchParams { beta: 0.0, cycles: 1, ..SearchParams::new(1, 2) });
        assert!(engine.search_subset_seeded(4).unwrap());
        let record = &engine.history()[0];
        assert_eq!(record.total_visits, 2);
        assert_eq!(record.visits.len(), 2);
    }

    #[test]
    fn zero_beta_scores_by_pheromone_alone() {
        let index = corpus();
        let similarity = SimilarityMatrix::compute_all(&index);
        let mut engine = Ufsaco::new(&index, &similarity, SearchParams { beta: 0.0, explore_exploit: 1.0, ..SearchParams::new(1, 5) });
        engine.init_pheromone();
        let z = index.term_universe().iter().position(|t| t == "z").unwrap();
        engine.pheromone[z] = 1.0;
        assert_eq!(engine.walk(0, 3).first().copied(), Some(z));
    }

    #[test]
    fn config_defaults() {
        let cfg = SearchConfig::from_json(r#"{"numberAnts": 3, "numberFeatures": 4, "topFeatures": 5, "beta": 2.0}"#).unwrap();
        let p = SearchParams::from_config(&cfg);
        assert_eq!(p.agents, 3);
        assert_eq!(p.subset_size, 4);
        assert_eq!(p.cycles, DEFAULT_CYCLES);
        assert_eq!(p.beta, 2.0);
        assert_eq!(p.initial_pheromone, DEFAULT_INITIAL_PHEROMONE);
    }

    #[test]
    fn full_decay_keeps_only_last_cycle() {
        let index = corpus();
        let similarity = SimilarityMatrix::compute_all(&index);
        let mut engine = Ufsaco::new(&index, &similarity, SearchParams { decay_rate: 1.0, ..params() });
        assert!(engine.search_subset_seeded(11).unwrap());

        let last = engine.history().last().unwrap();
        assert!(last.total_visits > 0);
        for term in index.term_universe() {
            let visits = last.visits.get(term).copied().unwrap_or(0);
            let expected = f64::from(visits) / last.total_visits as f64;
            assert_eq!(engine.pheromone(term), Some(expected));
        }
    }

    #[test]
    fn unvisited_term_only_decays() {
        let index = corpus();
        let similarity = SimilarityMatrix::compute_all(&index);
        let mut engine = Ufsaco::new(&index, &similarity, params());
        engine.search_subset_seeded(3).unwrap();

        assert!(engine.history().iter().all(|r| !r.visits.contains_key("z")));
        let expected = DEFAULT_INITIAL_PHEROMONE * (1.0 - DEFAULT_DECAY_RATE).powi(5);
        assert!((engine.pheromone("z").unwrap() - expected).abs() < 1e-12);
    }

    #[test]
    fn same_seed_same_pheromone() {
        let index = corpus();
        let similarity = SimilarityMatrix::compute_all(&index);
        let mut first = Ufsaco::new(&index, &similarity, params());
        let mut second = Ufsaco::new(&index, &similarity, params());
        first.search_subset_seeded(42).unwrap();
        second.search_subset_seeded(42).unwrap();
        assert_eq!(first.pheromone_table(), second.pheromone_table());
        assert_eq!(first.history(), second.history());
    }

    #[test]
    fn results_are_capped_and_sorted() {
        let index = corpus();
        let similarity = SimilarityMatrix::compute_all(&index);
        let mut engine = Ufsaco::new(&index, &similarity, params());
        engine.search_subset_seeded(5).unwrap();
        assert_eq!(engine.state(), SearchState::Converged);

        let top = engine.scored_feature_results(4);
        assert_eq!(top.len(), 4);
        assert!(top.windows(2).all(|w| w[0].1 >= w[1].1));
        assert_eq!(engine.feature_results(100).len(), index.term_count());
    }

    #[test]
    fn visits_per_cycle_are_bounded() {
        let index = corpus();
        let similarity = SimilarityMatrix::compute_all(&index);
        let mut engine = Ufsaco::new(&index, &similarity, params());
        engine.search_subset_seeded(9).unwrap();
        assert_eq!(engine.history().len(), 5);
        for record in engine.history() {
            assert!(record.total_visits <= 2 * 3);
            assert_eq!(record.visits.values().map(|c| u64::from(*c)).sum::<u64>(), record.total_visits);
        }
    }

    #[test]
    fn agents_stall_without_similarities() {
        let index = corpus();
        let mut engine = Ufsaco::new(&index, &SimilarityMatrix::new(), params());
        engine.search_subset_seeded(1).unwrap();
        assert!(engine.history().iter().all(|r| r.total_visits == 0));
        let expected = DEFAULT_INITIAL_PHEROMONE * (1.0 - DEFAULT_DECAY_RATE).powi(5);
        for (_, value) in engine.pheromone_table() {
            assert!((value - expected).abs() < 1e-12);
        }
    }

    #[test]
    fn greedy_and_probabilistic_pick_the_same_term() {
        let index = corpus();
        let similarity = SimilarityMatrix::compute_all(&index);
        for q in [0.0, 1.0] {
            let mut engine = Ufsaco::new(&index, &similarity, SearchParams { explore_exploit: q, ..SearchParams::new(1, 1) });
            engine.init_pheromone();
            let start = 0;
            let expected = engine.adjacency[start]
                .iter()
                .fold((None, 0.0), |(best, value), &(u, sim)| if sim > value { (Some(u), sim) } else { (best, value) })
                .0;
            assert_eq!(engine.walk(start, 7).first().copied(), expected);
        }
    }

    #[test]
    fn too_many_agents_is_refused() {
        let index = corpus();
        let similarity = SimilarityMatrix::compute_all(&index);
        let mut engine = Ufsaco::new(&index, &similarity, SearchParams::new(7, 2));
        assert_eq!(
            engine.search_subset_seeded(1),
            Err(SearchError::TooManyAgents { agents: 7, terms: 6 })
        );
        assert_eq!(engine.state(), SearchState::Uninitialized);
    }

    #[test]
    fn unloaded_engine_is_inert() {
        let mut engine = Ufsaco::unloaded(SearchParams::new(3, 3));
        assert!(!engine.is_index_loaded());
        assert_eq!(engine.search_subset_seeded(1), Ok(false));
        assert!(engine.feature_results(10).is_empty());
        assert!(engine.history().is_empty());
    }
}
