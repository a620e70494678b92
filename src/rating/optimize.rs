//! Unconstrained minimization with BFGS and a backtracking line search

use nalgebra::{DMatrix, DVector};

const ARMIJO_C1: f64 = 1.0e-4;
const MIN_STEP: f64 = 1.0e-12;
const CURVATURE_EPSILON: f64 = 1.0e-10;

/// Why the optimizer stopped
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Termination {
    Converged,
    MaxIterations,
    LineSearchFailed,
}

#[derive(Debug, Clone)]
pub struct Minimum {
    pub x: DVector<f64>,
    pub value: f64,
    pub iterations: usize,
    pub termination: Termination,
}

impl Minimum {
    pub fn converged(&self) -> bool {
        self.termination == Termination::Converged
    }
}

/// BFGS settings
#[derive(Debug, Clone)]
pub struct Bfgs {
    pub max_iterations: usize,
    /// Stop when the largest gradient component falls below this
    pub gradient_tolerance: f64,
}

impl Bfgs {
    pub fn new(max_iterations: usize, gradient_tolerance: f64) -> Self {
        Self {
            max_iterations,
            gradient_tolerance,
        }
    }

    /// Minimize `objective`, which returns the value and gradient at a point
    pub fn minimize<F>(&self, objective: F, start: DVector<f64>) -> Minimum
    where
        F: Fn(&DVector<f64>) -> (f64, DVector<f64>),
    {
        let dim = start.len();
        let identity = DMatrix::<f64>::identity(dim, dim);
        let mut inverse_hessian = identity.clone();
        let mut x = start;
        let (mut value, mut gradient) = objective(&x);

        for iteration in 0..self.max_iterations {
            if gradient.amax() < self.gradient_tolerance {
                return Minimum {
                    x,
                    value,
                    iterations: iteration,
                    termination: Termination::Converged,
                };
            }

            let mut direction = -(&inverse_hessian * &gradient);
            let mut slope = gradient.dot(&direction);
            if slope >= 0.0 {
                // Lost positive definiteness; restart from steepest descent
                inverse_hessian = identity.clone();
                direction = -gradient.clone();
                slope = gradient.dot(&direction);
            }

            let mut step = 1.0;
            let (next_x, next_value, next_gradient) = loop {
                let candidate = &x + &direction * step;
                let (candidate_value, candidate_gradient) = objective(&candidate);
                if candidate_value.is_finite()
                    && candidate_value <= value + ARMIJO_C1 * step * slope
                {
                    break (candidate, candidate_value, candidate_gradient);
                }
                step *= 0.5;
                if step < MIN_STEP {
                    return Minimum {
                        x,
                        value,
                        iterations: iteration,
                        termination: Termination::LineSearchFailed,
                    };
                }
            };

            let s = &next_x - &x;
            let y = &next_gradient - &gradient;
            let sy = s.dot(&y);
            if sy > CURVATURE_EPSILON {
                let rho = 1.0 / sy;
                let left = &identity - (&s * y.transpose()) * rho;
                let right = &identity - (&y * s.transpose()) * rho;
                inverse_hessian = left * &inverse_hessian * right + (&s * s.transpose()) * rho;
            }

            x = next_x;
            value = next_value;
            gradient = next_gradient;
        }

        let termination = if gradient.amax() < self.gradient_tolerance {
            Termination::Converged
        } else {
            Termination::MaxIterations
        };
        Minimum {
            x,
            value,
            iterations: self.max_iterations,
            termination,
        }
    }
}
