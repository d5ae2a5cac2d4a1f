//! Stacks of layers, each with its own local depth coordinate.

use smallvec::SmallVec;

use crate::error::RtmError;

/// Layers ordered from the surface down.
///
/// Each layer's solution is written in a local coordinate that is zero at its
/// own top. A depth on an interface belongs to the layer above it.
#[derive(Debug, Clone, PartialEq)]
pub struct Piecewise<L> {
    layers: SmallVec<[L; 2]>,
    /// Elevation of the top of each layer, decreasing
    tops: SmallVec<[f64; 2]>,
}

impl<L> Piecewise<L> {
    /// Stack `layers` given as `(thickness, layer)` from the surface down.
    /// There must be at least one.
    pub fn new(layers: impl IntoIterator<Item = (f64, L)>) -> Result<Self, RtmError> {
        let mut top = 0.;
        let mut tops = SmallVec::new();
        let mut stack = SmallVec::new();
        for (thickness, layer) in layers {
            tops.push(top);
            stack.push(layer);
            top -= thickness;
        }
        if stack.is_empty() {
            return Err(RtmError::InvalidParameter {
                name: "number of layers",
                value: 0.,
            });
        }
        Ok(Self {
            layers: stack,
            tops,
        })
    }

    /// The layers, top first.
    pub fn layers(&self) -> &[L] {
        &self.layers
    }

    /// Elevations of the interfaces between layers, top first.
    pub fn interfaces(&self) -> &[f64] {
        self.tops.get(1..).unwrap_or(&[])
    }

    /// The layer containing `z` and `z` in that layer's local coordinate.
    ///
    /// Depths below the last interface go to the bottom layer.
    pub fn locate(&self, z: f64) -> (&L, f64) {
        let index = self.interfaces().iter().take_while(|&&top| top > z).count();
        (&self.layers[index], z - self.tops[index])
    }

    /// The bottom layer.
    pub fn bottom(&self) -> &L {
        &self.layers[self.layers.len() - 1]
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_abs_diff_eq;

    #[test]
    fn interface_belongs_to_the_upper_layer() {
        let stack = Piecewise::new([(0.3, 'a'), (0.5, 'b'), (0.2, 'c')]).unwrap();
        assert_eq!(stack.interfaces().len(), 2);
        assert_abs_diff_eq!(stack.interfaces()[0], -0.3);
        assert_abs_diff_eq!(stack.interfaces()[1], -0.8);

        let (layer, local) = stack.locate(-0.1);
        assert_eq!((*layer, local), ('a', -0.1));
        let (layer, local) = stack.locate(-0.3);
        assert_eq!((*layer, local), ('a', -0.3));

        let (layer, local) = stack.locate(-0.5);
        assert_eq!(*layer, 'b');
        assert_abs_diff_eq!(local, -0.2, epsilon = 1e-15);

        let (layer, local) = stack.locate(-1.);
        assert_eq!(*layer, 'c');
        assert_abs_diff_eq!(local, -0.2, epsilon = 1e-15);
        assert_eq!(*stack.bottom(), 'c');
    }

    #[test]
    fn a_stack_needs_a_layer() {
        assert!(matches!(
            Piecewise::new(std::iter::empty::<(f64, char)>()),
            Err(RtmError::InvalidParameter { .. })
        ));
        let stack = Piecewise::new([(1., 'a')]).unwrap();
        assert!(stack.interfaces().is_empty());
        assert_eq!(stack.locate(-2.), (&'a', -2.));
        assert_eq!(*stack.bottom(), 'a');
    }
}
