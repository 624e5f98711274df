use dyns_core::errors::ErrorInfo;
use dyns_core::{
    derive_substream_seed, log_sum_exp, DynError, RngHandle, RunStats, Sampler, SamplerSettings,
};
use rand::{Rng, RngCore};
use tracing::{debug, info, warn};

use crate::likelihoods::Likelihood;
use crate::priors::Prior;
use crate::state::{self, LivePoint, SamplerState, LOG_ZERO};

/// Reference nested sampler.
///
/// Replacement points are generated by a random walk inside the likelihood
/// contour, started from a randomly chosen live point, with step sizes
/// matched to the spread of the live set. All randomness for the point that
/// replaces dead point `i` comes from a substream keyed by `i`, so a run
/// resumed from its resume file continues exactly as an uninterrupted run
/// with the same seed would.
pub struct NestedSampler<L, P> {
    likelihood: L,
    prior: P,
    ndim: usize,
    num_repeats: usize,
    max_draws: u64,
}

impl<L, P> NestedSampler<L, P>
where
    L: Likelihood,
    P: Prior,
{
    /// Creates a sampler over an `ndim`-dimensional hypercube.
    pub fn new(likelihood: L, prior: P, ndim: usize) -> Self {
        Self {
            likelihood,
            prior,
            ndim,
            num_repeats: 20,
            max_draws: 1_000_000,
        }
    }

    /// Sets the number of random-walk steps per replacement point.
    pub fn with_num_repeats(mut self, num_repeats: usize) -> Self {
        self.num_repeats = num_repeats.max(1);
        self
    }

    /// Caps the likelihood evaluations spent on a single replacement point.
    pub fn with_max_draws(mut self, max_draws: u64) -> Self {
        self.max_draws = max_draws.max(1);
        self
    }

    /// Dimension of the parameter space.
    pub fn ndim(&self) -> usize {
        self.ndim
    }

    fn evaluate(&self, cube: Vec<f64>, birth: f64, nlike: &mut u64) -> LivePoint {
        let theta = self.prior.transform(&cube);
        let logl = self.likelihood.log_likelihood(&theta);
        *nlike += 1;
        LivePoint {
            cube,
            theta,
            logl: if logl.is_finite() { logl } else { LOG_ZERO },
            birth,
        }
    }

    fn initial_state(&self, settings: &SamplerSettings) -> SamplerState {
        let master_seed = master_seed(settings);
        let mut rng = RngHandle::from_seed(derive_substream_seed(master_seed, u64::MAX));
        let mut nlike = 0;
        let nlive = settings.nlive.max(1);
        let live = (0..nlive)
            .map(|_| self.evaluate(rng.unit_cube(self.ndim), LOG_ZERO, &mut nlike))
            .collect();
        SamplerState {
            ndim: self.ndim,
            live,
            dead: Vec::new(),
            dead_nlive: Vec::new(),
            nlike,
            logx: 0.0,
            logz_dead: LOG_ZERO,
            master_seed,
            finished: false,
        }
    }

    fn load_or_init(&self, settings: &SamplerSettings) -> Result<SamplerState, DynError> {
        let path = settings.paths().resume();
        if !settings.read_resume {
            return Ok(self.initial_state(settings));
        }
        if !path.exists() {
            warn!(path = %path.display(), "resume requested but no resume file found, starting afresh");
            return Ok(self.initial_state(settings));
        }
        let mut state = SamplerState::load(&path)?;
        if state.ndim != self.ndim {
            return Err(DynError::Sampler(
                ErrorInfo::new("resume-ndim", "resume file dimension does not match the sampler")
                    .with_context("resume", state.ndim.to_string())
                    .with_context("sampler", self.ndim.to_string()),
            ));
        }
        // Seeds may change between invocations; later draws follow the new one.
        state.master_seed = master_seed(settings);
        debug!(ndead = state.dead.len(), nlive = state.live.len(), "resumed sampler state");
        Ok(state)
    }

    /// Draws a point with likelihood above `contour` by a random walk from
    /// `start`.
    fn constrained_draw(
        &self,
        start: &LivePoint,
        steps: &[f64],
        contour: f64,
        rng: &mut RngHandle,
        nlike: &mut u64,
    ) -> Result<LivePoint, DynError> {
        let mut current = start.clone();
        let mut accepted = 0usize;
        let mut shrink = 1.0;
        let mut draws = 0u64;
        let mut attempt = 0usize;
        while attempt < self.num_repeats || accepted == 0 {
            if draws >= self.max_draws {
                return Err(DynError::Sampler(
                    ErrorInfo::new(
                        "constrained-draw-exhausted",
                        "no point above the likelihood contour was found",
                    )
                    .with_context("contour", contour.to_string())
                    .with_context("draws", draws.to_string()),
                ));
            }
            let proposal: Vec<f64> = current
                .cube
                .iter()
                .zip(steps)
                .map(|(x, step)| x + shrink * step * (2.0 * rng.gen::<f64>() - 1.0))
                .collect();
            attempt += 1;
            if proposal.iter().any(|u| !(0.0..1.0).contains(u)) {
                if accepted == 0 && attempt >= self.num_repeats {
                    shrink *= 0.5;
                }
                continue;
            }
            draws += 1;
            let candidate = self.evaluate(proposal, contour, nlike);
            if candidate.logl > contour {
                current = candidate;
                accepted += 1;
            } else if accepted == 0 && attempt >= self.num_repeats {
                shrink *= 0.5;
            }
        }
        current.birth = contour;
        Ok(current)
    }

    fn step_sizes(&self, live: &[LivePoint]) -> Vec<f64> {
        if live.len() < 2 {
            return vec![0.1; self.ndim];
        }
        let n = live.len() as f64;
        (0..self.ndim)
            .map(|dim| {
                let mean = live.iter().map(|p| p.cube[dim]).sum::<f64>() / n;
                let var = live.iter().map(|p| (p.cube[dim] - mean).powi(2)).sum::<f64>() / n;
                // uniform steps of half-width sqrt(3) * std match the live spread
                (3.0 * var).sqrt().max(1e-9)
            })
            .collect()
    }

    fn converged(&self, state: &SamplerState, precision: f64) -> bool {
        let max_live = state
            .live
            .iter()
            .map(|p| p.logl)
            .fold(f64::NEG_INFINITY, f64::max);
        max_live + state.logx < state.logz_dead + precision.ln()
    }

    /// Kills the worst live point and replaces it as the schedule dictates.
    fn iterate(
        &self,
        state: &mut SamplerState,
        settings: &SamplerSettings,
    ) -> Result<(), DynError> {
        let worst = state
            .live
            .iter()
            .enumerate()
            .min_by(|a, b| a.1.logl.total_cmp(&b.1.logl))
            .map(|(idx, _)| idx)
            .ok_or_else(|| DynError::Sampler(ErrorInfo::new("empty-live-set", "no live points")))?;
        let nlive = state.live.len();
        let dead = state.live.swap_remove(worst);
        let contour = dead.logl;
        let shrink = 1.0 / nlive as f64;
        let log_dx = state.logx + (-(-shrink).exp_m1()).ln();
        state.logz_dead = log_sum_exp(&[state.logz_dead, contour + log_dx]);
        state.logx -= shrink;

        let target = if settings.nlives.is_empty() {
            settings.nlive.max(1)
        } else {
            settings.nlives.nlive_at(contour).unwrap_or(settings.nlive).max(1)
        };
        let additions = target.saturating_sub(state.live.len());
        let ndead = state.dead.len() as u64;
        let steps = self.step_sizes(&state.live);
        for slot in 0..additions {
            let mut rng = RngHandle::from_seed(derive_substream_seed(
                state.master_seed,
                ndead << 16 | slot as u64,
            ));
            let start = if state.live.is_empty() {
                &dead
            } else {
                &state.live[(rng.next_u64() % state.live.len() as u64) as usize]
            };
            let start = start.clone();
            let point = self.constrained_draw(&start, &steps, contour, &mut rng, &mut state.nlike)?;
            state.live.push(point);
        }
        state.dead.push(dead);
        state.dead_nlive.push(nlive);
        Ok(())
    }

    fn write_outputs(
        &self,
        state: &SamplerState,
        settings: &SamplerSettings,
    ) -> Result<RunStats, DynError> {
        let paths = settings.paths();
        let mut live: Vec<&LivePoint> = state.live.iter().collect();
        live.sort_by(|a, b| a.logl.total_cmp(&b.logl));
        let points: Vec<&LivePoint> = state.dead.iter().chain(live.iter().copied()).collect();
        state::write_dead_birth(&paths, &points)?;

        // Remaining live points share the final prior volume equally.
        let mut log_terms = vec![state.logz_dead];
        let share = state.logx - (live.len().max(1) as f64).ln();
        log_terms.extend(live.iter().map(|p| p.logl + share));
        let logz = log_sum_exp(&log_terms);
        let logz_err = information(state, logz).max(0.0).sqrt() / (settings.nlive.max(1) as f64).sqrt();

        let stats = RunStats {
            ndead: points.len(),
            nlike: state.nlike,
            logz: Some(logz),
            logz_err: Some(logz_err),
        };
        state::write_stats(&paths, &stats)?;
        Ok(stats)
    }
}

impl<L, P> Sampler for NestedSampler<L, P>
where
    L: Likelihood,
    P: Prior,
{
    fn run(&mut self, settings: &SamplerSettings) -> Result<(), DynError> {
        let mut state = self.load_or_init(settings)?;
        let cap = settings.ndead_cap();
        while !state.finished {
            if state.live.is_empty() || self.converged(&state, settings.precision_criterion) {
                state.finished = true;
                break;
            }
            if cap.is_some_and(|cap| state.dead.len() >= cap) {
                break;
            }
            self.iterate(&mut state, settings)?;
        }
        if settings.write_resume {
            state.store(&settings.paths().resume())?;
        }
        let stats = self.write_outputs(&state, settings)?;
        info!(
            file_root = %settings.file_root,
            ndead = stats.ndead,
            nlike = stats.nlike,
            logz = ?stats.logz,
            finished = state.finished,
            "sampler run stopped"
        );
        Ok(())
    }
}

/// Kullback-Leibler information of the posterior relative to the prior,
/// estimated from the dead points.
fn information(state: &SamplerState, logz: f64) -> f64 {
    let mut logx = 0.0;
    state
        .dead
        .iter()
        .zip(&state.dead_nlive)
        .map(|(point, nlive)| {
            let shrink = 1.0 / (*nlive).max(1) as f64;
            let log_w = logx + (-(-shrink).exp_m1()).ln() + point.logl - logz;
            logx -= shrink;
            log_w.exp() * (point.logl - logz)
        })
        .sum()
}

fn master_seed(settings: &SamplerSettings) -> u64 {
    if settings.seed >= 0 {
        settings.seed as u64
    } else {
        RngHandle::from_entropy().next_u64()
    }
}
