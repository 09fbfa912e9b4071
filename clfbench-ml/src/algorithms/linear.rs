//! L2-regularized multinomial logistic regression, backed by `linfa-logistic`.

use crate::algorithms::{
    Classifier, check_fit_input, check_predict_input, observed_classes, training_set,
};
use crate::error::MlError;
use linfa::prelude::*;
use linfa_logistic::{MultiFittedLogisticRegression, MultiLogisticRegression};
use ndarray::{Array1, ArrayView1, ArrayView2};

const ALGORITHM: &str = "logistic_regression";

enum Fitted {
    /// Only one class was seen during training.
    Constant(usize),
    Softmax(MultiFittedLogisticRegression<f64, usize>),
}

/// Softmax regression fit by L-BFGS. The L2 penalty is `1 / C`.
pub struct LogisticRegression {
    /// Inverse regularization strength.
    pub c: f64,
    pub max_iter: u64,
    /// Stop once the gradient norm is below this value.
    pub tol: f64,
    fitted: Option<Fitted>,
    n_features: Option<usize>,
}

impl LogisticRegression {
    pub fn new(c: f64, max_iter: u64, tol: f64) -> Self {
        Self {
            c,
            max_iter,
            tol,
            fitted: None,
            n_features: None,
        }
    }
}

impl Default for LogisticRegression {
    fn default() -> Self {
        Self::new(1.0, 1000, 1e-4)
    }
}

impl Classifier for LogisticRegression {
    fn algorithm(&self) -> &'static str {
        ALGORITHM
    }

    fn fit(&mut self, x: ArrayView2<'_, f64>, y: ArrayView1<'_, usize>) -> Result<(), MlError> {
        check_fit_input(ALGORITHM, x, y)?;
        if self.c <= 0.0 || self.tol <= 0.0 {
            return Err(MlError::model(ALGORITHM, "C and tol must be positive"));
        }

        let classes = observed_classes(y);
        let fitted = if let [only] = classes.as_slice() {
            Fitted::Constant(*only)
        } else {
            let model = MultiLogisticRegression::default()
                .alpha(1.0 / self.c)
                .max_iterations(self.max_iter)
                .gradient_tolerance(self.tol)
                .fit(&training_set(x, y))
                .map_err(|e| MlError::model(ALGORITHM, e.to_string()))?;
            Fitted::Softmax(model)
        };

        self.fitted = Some(fitted);
        self.n_features = Some(x.ncols());
        Ok(())
    }

    fn predict(&self, x: ArrayView2<'_, f64>) -> Result<Array1<usize>, MlError> {
        check_predict_input(ALGORITHM, x, self.n_features)?;
        match &self.fitted {
            Some(Fitted::Constant(class)) => Ok(Array1::from_elem(x.nrows(), *class)),
            Some(Fitted::Softmax(model)) => {
                let predicted: Array1<usize> = model.predict(&x);
                Ok(predicted)
            }
            None => Err(MlError::model(ALGORITHM, "predict called before fit")),
        }
    }
}
