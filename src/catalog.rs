// Protocol types offered for selection and their default instructions

pub const GENERAL_WET_LAB: &str = "General wet lab";

pub const PROTOCOL_TYPES: &[&str] = &[
    GENERAL_WET_LAB,
    "PCR",
    "Rodent brain surgery",
    "RNA extraction",
    "Cell transfection",
    "Histology",
    "Flow Cytometry",
    "Synthetic biology assay",
    "Organoid culture",
    "DNA extraction",
    "cDNA synthesis",
    "Western blot",
    "ELISA",
    "qPCR",
    "CRISPR genome editing",
    "Gel electrophoresis",
    "Bacterial transformation",
    "Plasmid purification",
    "Immunoprecipitation",
    "Immunofluorescence",
    "Live cell imaging",
    "Single-cell RNA-seq",
    "Chromatin immunoprecipitation (ChIP)",
    "Tissue staining",
    "In vivo imaging",
    "Optogenetics",
    "Stereotaxic injection",
    "Yeast transformation",
    "NGS library prep",
    "Cell cycle assay",
    "Time-course experiment setup",
];

const GENERAL_INSTRUCTION: &str = "You are a practical wet lab assistant. Given the protocol below, do the following clearly and concisely:

1. **Issues / Ambiguities:** Bullet any missing parameters (volumes, concentrations, equipment), unclear sequencing, or potential errors.
2. **Parallelization Opportunities:** Exactly state which steps can overlap and why.
3. **Reordered Optimized Protocol:** Provide a step-by-step version that minimizes idle time, annotate each with estimated duration and saved time.
4. **Checklist:** Condensed actionable checklist with checkboxes.

Protocol:
{protocol_text}";

const PCR_INSTRUCTION: &str = "You are a practical wet lab assistant focused on PCR workflows. Given the protocol below, do the following:

1. List missing reagent volumes, thermal cycling parameters, and ambiguity.
2. Point out what can be parallelized (e.g., tube preparation during machine warm-up).
3. Reorder to minimize idle time and annotate estimated duration.
4. Give a concise checklist.

Protocol:
{protocol_text}";

const RODENT_SURGERY_INSTRUCTION: &str = "You are an expert surgical lab assistant for rodent brain surgery. Given the protocol below, do the following with safety focus:

1. Issues/Ambiguities: missing doses, sterility lapses, monitoring gaps.
2. Parallelization: prep that can happen while anesthesia stabilizes.
3. Optimized Protocol: minimize anesthesia time with rationale.
4. Safety & Recovery Checklist.
5. Contingencies: brief mitigation steps.

Protocol:
{protocol_text}";

pub fn is_known_type(protocol_type: &str) -> bool {
    PROTOCOL_TYPES.contains(&protocol_type)
}

/// Default instruction for a protocol type. Types without a dedicated
/// instruction get the general wet lab one.
pub fn default_instruction(protocol_type: &str) -> &'static str {
    match protocol_type {
        "PCR" => PCR_INSTRUCTION,
        "Rodent brain surgery" => RODENT_SURGERY_INSTRUCTION,
        _ => GENERAL_INSTRUCTION,
    }
}
