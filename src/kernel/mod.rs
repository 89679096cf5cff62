//! Kernel functions for SVM

pub mod linear;
pub mod polynomial;
pub mod rbf;
pub mod sigmoid;
pub mod traits;

pub use self::linear::*;
pub use self::polynomial::*;
pub use self::rbf::*;
pub use self::sigmoid::*;
pub use self::traits::*;

use crate::core::{BridgeError, KernelType, Result, SvmNode, SvmParameter};
use serde::{Deserialize, Serialize};

/// A kernel selected by an `svm_parameter` record
///
/// Serializable so a saved model can rebuild its kernel.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum KernelFunction {
    Linear,
    Polynomial { degree: i32, gamma: f64, coef0: f64 },
    Rbf { gamma: f64 },
    Sigmoid { gamma: f64, coef0: f64 },
}

impl KernelFunction {
    /// Select the kernel named by `param`
    pub fn from_parameter(param: &SvmParameter) -> Result<Self> {
        match param.kernel_type()? {
            KernelType::Linear => Ok(KernelFunction::Linear),
            KernelType::Poly => Ok(KernelFunction::Polynomial {
                degree: param.degree(),
                gamma: param.gamma(),
                coef0: param.coef0(),
            }),
            KernelType::Rbf => Ok(KernelFunction::Rbf {
                gamma: param.gamma(),
            }),
            KernelType::Sigmoid => Ok(KernelFunction::Sigmoid {
                gamma: param.gamma(),
                coef0: param.coef0(),
            }),
            KernelType::Precomputed => Err(BridgeError::Unsupported(
                "precomputed kernels".to_string(),
            )),
        }
    }
}

impl Kernel for KernelFunction {
    fn compute(&self, x: &[SvmNode], y: &[SvmNode]) -> f64 {
        match *self {
            KernelFunction::Linear => LinearKernel.compute(x, y),
            KernelFunction::Polynomial {
                degree,
                gamma,
                coef0,
            } => PolynomialKernel::new(degree, gamma, coef0).compute(x, y),
            KernelFunction::Rbf { gamma } => RbfKernel::new(gamma).compute(x, y),
            KernelFunction::Sigmoid { gamma, coef0 } => SigmoidKernel::new(gamma, coef0).compute(x, y),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::kernel::linear::nodes;
    use crate::marshal::Parameters;

    #[test]
    fn test_kernel_from_parameters() {
        let params = Parameters::builder().poly(0.5, 1.0, 2).build().unwrap();
        assert_eq!(
            KernelFunction::from_parameter(params.raw()).unwrap(),
            KernelFunction::Polynomial {
                degree: 2,
                gamma: 0.5,
                coef0: 1.0
            }
        );

        let params = Parameters::builder().linear().build().unwrap();
        assert_eq!(
            KernelFunction::from_parameter(params.raw()).unwrap(),
            KernelFunction::Linear
        );
    }

    #[test]
    fn test_precomputed_is_unsupported() {
        let params = Parameters::builder()
            .with_kernel(KernelType::Precomputed)
            .build()
            .unwrap();
        assert!(matches!(
            KernelFunction::from_parameter(params.raw()),
            Err(BridgeError::Unsupported(_))
        ));
    }

    #[test]
    fn test_kernel_dispatch() {
        let x = nodes(&[(1, 1.0), (2, 2.0)]);
        let y = nodes(&[(1, 2.0), (2, 0.5)]);

        assert_eq!(KernelFunction::Linear.compute(&x, &y), 3.0);
        assert_eq!(
            KernelFunction::Rbf { gamma: 1.0 }.compute(&x, &y),
            RbfKernel::new(1.0).compute(&x, &y)
        );
    }

    #[test]
    fn test_kernel_serde_tag() {
        let json = serde_json::to_string(&KernelFunction::Rbf { gamma: 0.5 }).unwrap();
        assert_eq!(json, r#"{"type":"rbf","gamma":0.5}"#);
        let back: KernelFunction = serde_json::from_str(&json).unwrap();
        assert_eq!(back, KernelFunction::Rbf { gamma: 0.5 });
    }
}
