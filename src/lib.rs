//! # brancher-distr
//!
//! $$
//! \log p(x\mid\theta)\in\mathbb{R}^{S\times B},\qquad x\in\mathbb{R}^{S\times B\times E_1\times\cdots}
//! $$
//!
//! Probability distributions for variational inference over a (sample, batch,
//! event...) tensor layout: closed-form log-probabilities, reparameterizable
//! samplers, rejection-sampled truncation and without-replacement minibatch
//! resampling of datasets.
//!
//! | Module | Contents |
//! |---|---|
//! | [`broadcast`] | shared broadcasting and reduction over the axis layout |
//! | [`distributions`] | the catalog, [`distributions::Truncated`] and [`distributions::Empirical`] |
//! | [`params`] | named parameter tensors |
//! | [`config`] | empirical and truncation configuration |
//! | [`error`] | [`DistributionError`] |
//! | [`traits`] | [`Distribution`] and [`ImplicitDistribution`] |

pub mod broadcast;
pub mod config;
pub mod distributions;
pub mod error;
pub mod params;
pub mod traits;

pub use config::EmpiricalConfig;
pub use config::TruncationConfig;
pub use distributions::DistributionKind;
pub use error::DistributionError;
pub use error::Result;
pub use params::Parameters;
pub use traits::Distribution;
pub use traits::ImplicitDistribution;
