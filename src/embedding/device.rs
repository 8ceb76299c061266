use candle_core::Device;
use tracing::{debug, info, warn};

use super::error::EncoderError;
use crate::config::DevicePreference;

/// Resolves the configured preference to a concrete device.
///
/// `Auto` walks Metal, then CUDA, and falls back to CPU. An explicit
/// accelerator that cannot be opened is an error rather than a silent fallback.
pub fn select_device(preference: DevicePreference) -> Result<Device, EncoderError> {
    match preference {
        DevicePreference::Cpu => {
            debug!("CPU device requested");
            Ok(Device::Cpu)
        }
        DevicePreference::Cuda => open_cuda(),
        DevicePreference::Metal => open_metal(),
        DevicePreference::Auto => {
            let mut failures: Vec<String> = Vec::new();

            if cfg!(feature = "metal") {
                match open_metal() {
                    Ok(device) => return Ok(device),
                    Err(e) => failures.push(e.to_string()),
                }
            }

            if cfg!(feature = "cuda") {
                match open_cuda() {
                    Ok(device) => return Ok(device),
                    Err(e) => failures.push(e.to_string()),
                }
            }

            let reason = if !cfg!(any(feature = "metal", feature = "cuda")) {
                "no GPU backend compiled".to_string()
            } else {
                failures.join("; ")
            };

            warn!(reason = %reason, "Falling back to CPU device");
            Ok(Device::Cpu)
        }
    }
}

fn open_cuda() -> Result<Device, EncoderError> {
    Device::new_cuda(0)
        .inspect(|_| info!("Using CUDA GPU acceleration"))
        .map_err(|e| EncoderError::DeviceUnavailable {
            device: "cuda".to_string(),
            reason: e.to_string(),
        })
}

fn open_metal() -> Result<Device, EncoderError> {
    Device::new_metal(0)
        .inspect(|_| info!("Using Metal GPU acceleration"))
        .map_err(|e| EncoderError::DeviceUnavailable {
            device: "metal".to_string(),
            reason: e.to_string(),
        })
}
