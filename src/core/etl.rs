use crate::core::Pipeline;
use crate::utils::error::Result;

pub struct EtlEngine<P: Pipeline> {
    pipeline: P,
}

impl<P: Pipeline> EtlEngine<P> {
    pub fn new(pipeline: P) -> Self {
        Self { pipeline }
    }

    pub fn run(&self) -> Result<String> {
        tracing::info!("Starting risk analysis...");

        // Extract
        let raw_data = self.pipeline.extract()?;
        tracing::info!("Extracted {} records", raw_data.len());

        // Transform
        let transformed = self.pipeline.transform(raw_data)?;
        tracing::info!(
            "Classified {} records",
            transformed.output.classified.len()
        );

        // Load
        let output_path = self.pipeline.load(transformed)?;
        tracing::info!("Report saved to: {}", output_path);

        Ok(output_path)
    }
}
