use super::{Relu, Sigmoid};

/// An element-wise activation function applied after a layer's affine map.
#[derive(Clone, Debug)]
pub enum ActFn {
    Relu(Relu),
    Sigmoid(Sigmoid),
}

impl ActFn {
    pub fn relu() -> Self {
        Self::Relu(Relu)
    }

    pub fn sigmoid(amp: f32) -> Self {
        Self::Sigmoid(Sigmoid::new(amp))
    }

    pub fn f(&self, x: f32) -> f32 {
        match self {
            Self::Relu(a) => a.f(x),
            Self::Sigmoid(a) => a.f(x),
        }
    }

    pub fn df(&self, x: f32) -> f32 {
        match self {
            Self::Relu(a) => a.df(x),
            Self::Sigmoid(a) => a.df(x),
        }
    }

    /// Short name used when describing a model.
    pub fn name(&self) -> &'static str {
        match self {
            Self::Relu(_) => "relu",
            Self::Sigmoid(_) => "sigmoid",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn relu_clamps_negatives_and_gates_the_derivative() {
        let act = ActFn::relu();

        assert_eq!(act.f(-2.0), 0.0);
        assert_eq!(act.f(3.0), 3.0);
        assert_eq!(act.df(-2.0), 0.0);
        assert_eq!(act.df(3.0), 1.0);
    }

    #[test]
    fn sigmoid_derivative_matches_finite_differences() {
        let act = ActFn::sigmoid(2.0);
        let eps = 1e-3;

        for z in [-2.0_f32, -0.5, 0.0, 0.7, 3.0] {
            let numeric = (act.f(z + eps) - act.f(z - eps)) / (2.0 * eps);
            assert!((numeric - act.df(z)).abs() < 1e-3, "z = {z}");
        }
    }
}
