#[cfg(test)]
mod qc_tests {
    use crate::error::AnalysisError;
    use crate::matrix::{CallStats, GenotypeMatrix, SnpInfo};
    use crate::qc::*;
    use crate::tests::{five_by_ten_vcf, vcf_text};
    use crate::vcf::read_vcf;
    use ndarray::Array2;

    fn snp(pos: i64) -> SnpInfo {
        SnpInfo {
            chrom: "chr1".to_string(),
            pos,
            id: ".".to_string(),
            reference: "A".to_string(),
            alternate: "G".to_string(),
            biallelic: true,
        }
    }

    #[test]
    fn test_five_by_ten_scenario() {
        let genotypes = read_vcf(five_by_ten_vcf().as_bytes()).unwrap();
        let filtered = apply_qc(&genotypes, &QcThresholds::default()).expect("QC should pass");
        let summary = filtered.summary();

        assert_eq!(summary.snps_before, 10);
        assert_eq!(summary.samples_before, 5);
        assert_eq!(summary.snps_removed_missing, 1);
        assert_eq!(summary.snps_removed_maf, 1);
        assert_eq!(summary.snps_removed_multiallelic, 0);
        assert_eq!(summary.snps_after, 8);
        assert_eq!(summary.samples_after, 5);
        assert_eq!(filtered.n_snps(), 8);

        // The 40%-missing SNP is gone, the SNP at exactly 20% stays
        let keys: Vec<String> = filtered.snps().iter().map(|s| s.key()).collect();
        assert!(!keys.contains(&"chr2:400".to_string()));
        assert!(!keys.contains(&"chr2:500".to_string()));
        assert!(keys.contains(&"chr1:500".to_string()));
    }

    #[test]
    fn test_retained_snps_respect_thresholds() {
        let genotypes = read_vcf(five_by_ten_vcf().as_bytes()).unwrap();
        for &(maf, miss) in &[(0.05, 0.2), (0.2, 0.0), (0.0, 1.0), (0.3, 0.5)] {
            let thresholds = QcThresholds::new(maf, miss, 1.0).unwrap();
            let filtered = match apply_qc(&genotypes, &thresholds) {
                Ok(f) => f,
                Err(AnalysisError::EmptyResult(_)) => continue,
                Err(e) => panic!("unexpected error: {}", e),
            };
            // No samples are dropped at this sample threshold
            for (j, _) in filtered.snps().iter().enumerate() {
                let stats = CallStats::from_calls(filtered.matrix().calls().column(j));
                assert!(stats.missing_rate() <= miss, "missing rate {} > {}", stats.missing_rate(), miss);
                assert!(stats.minor_allele_frequency() >= maf, "MAF {} < {}", stats.minor_allele_frequency(), maf);
            }
        }
    }

    #[test]
    fn test_sample_missingness_uses_surviving_snps() {
        // Sample c is missing at SNPs 1 and 2. SNP 2 is monomorphic among
        // called genotypes and is dropped by MAF; over the remaining 3 SNPs
        // c is 1/3 missing rather than 2/4.
        let text = vcf_text(
            &["a", "b", "c", "d", "e"],
            &[
                ("chr1", 1, "A", "G", &["0/1", "0/0", "./.", "1/1", "0/1"]),
                ("chr1", 2, "A", "G", &["0/0", "0/0", "./.", "0/0", "0/0"]),
                ("chr1", 3, "A", "G", &["0/1", "1/1", "0/0", "0/0", "0/1"]),
                ("chr1", 4, "A", "G", &["0/0", "0/1", "0/1", "1/1", "0/0"]),
            ],
        );
        let genotypes = read_vcf(text.as_bytes()).unwrap();

        let keep = QcThresholds::new(0.05, 0.2, 0.4).unwrap();
        let filtered = apply_qc(&genotypes, &keep).unwrap();
        assert_eq!(filtered.summary().snps_removed_maf, 1);
        assert_eq!(filtered.n_samples(), 5);

        let strict = QcThresholds::new(0.05, 0.2, 0.3).unwrap();
        let filtered = apply_qc(&genotypes, &strict).unwrap();
        assert_eq!(filtered.n_samples(), 4);
        assert_eq!(filtered.summary().samples_removed_missing, 1);
        assert!(!filtered.sample_ids().contains(&"c".to_string()));
    }

    #[test]
    fn test_multiallelic_removed_first() {
        let text = vcf_text(
            &["a", "b", "c"],
            &[
                ("chr1", 1, "A", "G,T", &["0/1", "0/0", "1/1"]),
                ("chr1", 2, "A", "G", &["0/1", "0/0", "1/1"]),
            ],
        );
        let genotypes = read_vcf(text.as_bytes()).unwrap();
        let filtered = apply_qc(&genotypes, &QcThresholds::default()).unwrap();
        assert_eq!(filtered.summary().snps_removed_multiallelic, 1);
        assert_eq!(filtered.n_snps(), 1);
    }

    #[test]
    fn test_no_snps_pass() {
        let text = vcf_text(
            &["a", "b", "c"],
            &[
                ("chr1", 1, "A", "G", &["0/0", "0/0", "0/0"]),
                ("chr1", 2, "A", "G", &["1/1", "1/1", "1/1"]),
            ],
        );
        let genotypes = read_vcf(text.as_bytes()).unwrap();
        match apply_qc(&genotypes, &QcThresholds::default()) {
            Err(AnalysisError::EmptyResult(msg)) => assert!(msg.contains("no SNPs passed QC")),
            other => panic!("expected EmptyResult, got {:?}", other),
        }
    }

    #[test]
    fn test_no_samples_pass() {
        let mut calls = Array2::<Option<u8>>::from_elem((3, 4), None);
        // Every sample misses at least a quarter of the SNPs
        calls[[0, 0]] = Some(0);
        calls[[0, 1]] = Some(2);
        calls[[1, 2]] = Some(0);
        calls[[1, 3]] = Some(2);
        calls[[2, 0]] = Some(1);
        calls[[2, 2]] = Some(1);
        calls[[2, 1]] = Some(1);
        calls[[0, 3]] = Some(1);
        let ids = vec!["a".to_string(), "b".to_string(), "c".to_string()];
        let matrix = GenotypeMatrix::new(ids, (1..=4).map(snp).collect(), calls).unwrap();

        let thresholds = QcThresholds::new(0.0, 1.0, 0.1).unwrap();
        match apply_qc(&matrix, &thresholds) {
            Err(AnalysisError::EmptyResult(msg)) => assert!(msg.contains("no samples passed")),
            other => panic!("expected EmptyResult, got {:?}", other),
        }
    }

    #[test]
    fn test_threshold_validation() {
        assert!(QcThresholds::new(0.05, 0.2, 0.2).is_ok());
        assert!(QcThresholds::new(0.0, 0.0, 1.0).is_ok());
        assert!(matches!(QcThresholds::new(-0.1, 0.2, 0.2), Err(AnalysisError::InvalidParameter(_))));
        assert!(matches!(QcThresholds::new(0.05, 1.5, 0.2), Err(AnalysisError::InvalidParameter(_))));
        assert!(matches!(QcThresholds::new(0.05, 0.2, f64::NAN), Err(AnalysisError::InvalidParameter(_))));
    }

    #[test]
    fn test_retention_percentages() {
        let summary = QcSummary {
            samples_before: 4,
            samples_after: 3,
            snps_before: 10,
            snps_after: 5,
            ..QcSummary::default()
        };
        assert!((summary.sample_retention_pct() - 75.0).abs() < 1e-12);
        assert!((summary.snp_retention_pct() - 50.0).abs() < 1e-12);
        assert_eq!(QcSummary::default().snp_retention_pct(), 0.0);
    }

    #[test]
    fn test_genotype_matrix_rejects_bad_shapes() {
        let calls = Array2::<Option<u8>>::from_elem((2, 2), Some(0));
        let ids = vec!["a".to_string()];
        assert!(GenotypeMatrix::new(ids, vec![snp(1), snp(2)], calls).is_err());

        let calls = Array2::<Option<u8>>::from_elem((1, 1), Some(3));
        assert!(GenotypeMatrix::new(vec!["a".to_string()], vec![snp(1)], calls).is_err());
    }
}
