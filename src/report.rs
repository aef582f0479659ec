// report.rs

use std::fmt::Write;

use crate::pipeline::PcaReport;
use crate::qc::QcSummary;

/// PC1 explaining more than this share of variance is read as strong structure.
const STRONG_STRUCTURE_PC1: f64 = 0.1;

/// Markdown summary of QC retention.
pub fn render_qc_summary(summary: &QcSummary) -> String {
    let mut text = String::from("### Quality control summary\n\n");
    let _ = writeln!(
        text,
        "**Samples**: {} of {} ({:.1}% retained, {} removed)\n",
        summary.samples_after,
        summary.samples_before,
        summary.sample_retention_pct(),
        summary.samples_before - summary.samples_after
    );
    let _ = writeln!(
        text,
        "**SNPs**: {} of {} ({:.1}% retained, {} removed)\n",
        summary.snps_after,
        summary.snps_before,
        summary.snp_retention_pct(),
        summary.snps_before - summary.snps_after
    );
    let _ = writeln!(
        text,
        "- multi-allelic: {}\n- above SNP missingness threshold: {}\n- below MAF threshold: {}\n- samples above missingness threshold: {}",
        summary.snps_removed_multiallelic,
        summary.snps_removed_missing,
        summary.snps_removed_maf,
        summary.samples_removed_missing
    );
    text
}

/// Markdown text describing QC retention, variance explained and a short interpretation.
pub fn render_insights(report: &PcaReport) -> String {
    let mut text = render_qc_summary(&report.qc);
    let ratios = &report.pca.explained_variance_ratio;

    text.push_str("\n### PCA results\n\n");
    if report.pca.component_count < report.pca.requested_components {
        let _ = writeln!(
            text,
            "{} components were requested; the data supports {}.\n",
            report.pca.requested_components, report.pca.component_count
        );
    }

    if let Some(&pc1) = ratios.first() {
        let _ = writeln!(text, "- **PC1** explains **{:.2}%** of the genetic variation", pc1 * 100.0);
    }
    if let Some(&pc2) = ratios.get(1) {
        let _ = writeln!(text, "- **PC2** explains **{:.2}%** of the genetic variation", pc2 * 100.0);
        let _ = writeln!(
            text,
            "- **PC1 & PC2** together explain **{:.2}%** of the total variation",
            report.pca.cumulative_variance_ratio(2) * 100.0
        );
    }
    if let Some(&pc3) = ratios.get(2) {
        let _ = writeln!(text, "- **PC3** explains **{:.2}%** of the genetic variation", pc3 * 100.0);
        let _ = writeln!(
            text,
            "- **The first 3 PCs** explain **{:.2}%** of the total variation",
            report.pca.cumulative_variance_ratio(3) * 100.0
        );
    }

    if let Some(&pc1) = ratios.first() {
        text.push_str("\n### Interpretation\n\n");
        if pc1 > STRONG_STRUCTURE_PC1 {
            text.push_str(
                "The first principal component captures a large share of the genetic variation, \
                 pointing to strong population structure or differentiation in the dataset.\n",
            );
        } else {
            text.push_str(
                "Genetic variation is spread across several components, \
                 pointing to subtle population structure or high genetic diversity.\n",
            );
        }
    }

    text
}
