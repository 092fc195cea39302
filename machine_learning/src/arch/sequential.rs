use std::{
    fmt::{self, Display},
    mem,
};

use ndarray::{Array2, ArrayView2};
use rand::Rng;

use super::{Model, ParamSlot, activations::ActFn, layers::Layer};
use crate::{MlErr, Result};

/// A sequential model: information flows forward when computing an output and backward when
/// computing the *deltas* of its layers.
#[derive(Clone, Debug)]
pub struct Sequential {
    layers: Vec<Layer>,
}

impl Sequential {
    /// Creates a new `Sequential`.
    ///
    /// # Arguments
    /// * `layers` - The layers the sequential is composed of.
    pub fn new<I>(layers: I) -> Self
    where
        I: IntoIterator<Item = Layer>,
    {
        Self {
            layers: layers.into_iter().collect(),
        }
    }

    /// Creates a multilayer perceptron: one dense layer per consecutive pair of sizes, with
    /// `act_fn` between them and raw outputs on the last one.
    ///
    /// # Arguments
    /// * `layer_sizes` - The width of every layer, input and output included.
    /// * `act_fn` - The hidden activation.
    ///
    /// # Returns
    /// The model, or an error if fewer than two sizes are given or any of them is zero.
    pub fn mlp(layer_sizes: &[usize], act_fn: ActFn) -> Result<Self> {
        if layer_sizes.len() < 2 {
            return Err(MlErr::InvalidConfig(
                "a perceptron needs at least an input and an output size",
            ));
        }

        if layer_sizes.contains(&0) {
            return Err(MlErr::InvalidConfig("layer sizes must be positive"));
        }

        let last = layer_sizes.len() - 2;
        let layers = layer_sizes.windows(2).enumerate().map(|(i, dims)| {
            let act_fn = (i != last).then(|| act_fn.clone());
            Layer::dense((dims[0], dims[1]), act_fn)
        });

        Ok(Self::new(layers))
    }

    /// Draws a fresh parameter buffer for this architecture.
    pub fn init_params<R: Rng + ?Sized>(&self, rng: &mut R) -> Result<Vec<f32>> {
        let mut params = Vec::with_capacity(self.size());

        for layer in &self.layers {
            params.extend(layer.init_params(rng)?);
        }

        Ok(params)
    }

    fn check_len(&self, what: &'static str, got: usize) -> Result<()> {
        let expected = self.size();

        if got != expected {
            return Err(MlErr::SizeMismatch {
                what,
                got,
                expected,
            });
        }

        Ok(())
    }
}

impl Model for Sequential {
    fn size(&self) -> usize {
        self.layers.iter().map(|layer| layer.size()).sum()
    }

    fn layout(&self) -> Vec<ParamSlot> {
        let mut slots = Vec::with_capacity(self.layers.len() * 2);
        let mut offset = 0;

        for (i, layer) in self.layers.iter().enumerate() {
            match layer {
                Layer::Dense(dense) => {
                    let (fan_in, fan_out) = dense.dim();
                    let w_end = offset + fan_in * fan_out;
                    let b_end = w_end + fan_out;

                    slots.push(ParamSlot {
                        name: format!("dense{i}.weight"),
                        range: offset..w_end,
                    });
                    slots.push(ParamSlot {
                        name: format!("dense{i}.bias"),
                        range: w_end..b_end,
                    });

                    offset = b_end;
                }
            }
        }

        slots
    }

    fn forward(&mut self, params: &[f32], x: ArrayView2<f32>) -> Result<Array2<f32>> {
        self.check_len("sequential parameters", params.len())?;

        let mut rest = params;
        let mut out = x.to_owned();

        for layer in self.layers.iter_mut() {
            let (head, tail) = rest.split_at(layer.size());
            out = layer.forward(head, out.view())?;
            rest = tail;
        }

        Ok(out)
    }

    fn backward(&mut self, params: &[f32], grad: &mut [f32], mut d: Array2<f32>) -> Result<()> {
        self.check_len("sequential parameters", params.len())?;
        self.check_len("sequential gradient", grad.len())?;

        let mut params_rest = params;
        let mut grad_rest = grad;

        for layer in self.layers.iter_mut().rev() {
            let size = layer.size();
            let (params_head, params_tail) = params_rest.split_at(params_rest.len() - size);
            let grad_len = grad_rest.len();
            let (grad_head, grad_tail) = mem::take(&mut grad_rest).split_at_mut(grad_len - size);

            d = layer.backward(params_tail, grad_tail, d)?;

            params_rest = params_head;
            grad_rest = grad_head;
        }

        Ok(())
    }
}

impl Display for Sequential {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "Sequential(")?;

        for (i, layer) in self.layers.iter().enumerate() {
            match layer {
                Layer::Dense(dense) => {
                    let (fan_in, fan_out) = dense.dim();
                    let act = dense.act_fn().map_or("none", ActFn::name);
                    writeln!(f, "  ({i}): Dense(in={fan_in}, out={fan_out}, act={act})")?;
                }
            }
        }

        write!(f, ")")
    }
}
