use assay_core::{config::Config, constants::MIB_PER_GB, errors::DomainError, model::PipelineStep};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StepResources {
    pub vcpus: u32,
    pub memory_mib: u64,
}

/// Gigabytes to the batch service's MiB, rounded to the nearest MiB.
pub fn gb_to_mib(gb: f64) -> u64 {
    (gb * MIB_PER_GB).round() as u64
}

pub fn resolve_for_step(
    index: usize,
    step: &PipelineStep,
    config: &Config,
) -> Result<StepResources, DomainError> {
    if step.cores == 0 {
        return Err(DomainError::validation(format!(
            "step {} requests 0 cores",
            index
        )));
    }

    let memory_gb = step.memory.unwrap_or(config.default_memory_gb);
    if !(memory_gb.is_finite() && memory_gb > 0.0) {
        return Err(DomainError::validation(format!(
            "step {} requests invalid memory {} GB",
            index, memory_gb
        )));
    }
    let memory_mib = gb_to_mib(memory_gb);
    if memory_mib == 0 {
        return Err(DomainError::validation(format!(
            "step {} requests {} GB, which rounds to 0 MiB",
            index, memory_gb
        )));
    }

    let resolved = StepResources {
        vcpus: step.cores,
        memory_mib,
    };
    tracing::debug!("Resolved resources for step {}: {:?}", index, resolved);
    Ok(resolved)
}
