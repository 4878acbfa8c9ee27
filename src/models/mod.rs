//! External model seam: the predictor contract plus two reference predictors.

pub mod ensemble;
pub mod linear;
pub mod predictor;

pub use ensemble::WeightedEnsemble;
pub use linear::LinearScorer;
pub use predictor::Predictor;
