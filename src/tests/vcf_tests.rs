#[cfg(test)]
mod vcf_tests {
    use crate::error::AnalysisError;
    use crate::tests::{five_by_ten_vcf, vcf_text};
    use crate::vcf::*;
    use flate2::write::GzEncoder;
    use flate2::Compression;
    use std::io::Write;

    #[test]
    fn test_encode_genotype() {
        assert_eq!(encode_genotype("0/0"), (Some(0), false));
        assert_eq!(encode_genotype("0|1"), (Some(1), false));
        assert_eq!(encode_genotype("1/0"), (Some(1), false));
        assert_eq!(encode_genotype("1|1"), (Some(2), false));
        assert_eq!(encode_genotype("./."), (None, false));
        assert_eq!(encode_genotype("0/."), (None, false));
        assert_eq!(encode_genotype("1/2"), (None, true));
        // Haploid and polyploid calls are treated as missing
        assert_eq!(encode_genotype("1"), (None, false));
        assert_eq!(encode_genotype("0/1/1"), (None, false));
    }

    #[test]
    fn test_read_vcf_dimensions_and_calls() {
        let matrix = read_vcf(five_by_ten_vcf().as_bytes()).expect("valid VCF");
        assert_eq!(matrix.n_samples(), 5);
        assert_eq!(matrix.n_snps(), 10);
        assert_eq!(matrix.sample_ids(), &["s1", "s2", "s3", "s4", "s5"]);
        assert_eq!(matrix.snps()[0].key(), "chr1:100");
        assert_eq!(matrix.snps()[5].chrom, "chr2");

        let calls = matrix.calls();
        assert_eq!(calls[[0, 0]], Some(0));
        assert_eq!(calls[[2, 0]], Some(2));
        assert_eq!(calls[[1, 0]], Some(1));
        assert_eq!(calls[[4, 4]], None);
        assert_eq!(calls[[0, 8]], None);
    }

    #[test]
    fn test_format_with_extra_fields() {
        let text = "\
##fileformat=VCFv4.2
#CHROM\tPOS\tID\tREF\tALT\tQUAL\tFILTER\tINFO\tFORMAT\tA\tB
chr1\t10\trs1\tA\tG\t.\tPASS\t.\tDP:GT:GQ\t12:0/1:30\t8:1/1:20
";
        let matrix = read_vcf(text.as_bytes()).expect("valid VCF");
        assert_eq!(matrix.calls()[[0, 0]], Some(1));
        assert_eq!(matrix.calls()[[1, 0]], Some(2));
        assert_eq!(matrix.snps()[0].id, "rs1");
    }

    #[test]
    fn test_multiallelic_sites_are_flagged() {
        let text = vcf_text(
            &["a", "b"],
            &[
                ("chr1", 1, "A", "G,T", &["0/1", "0/0"]),
                ("chr1", 2, "A", "G", &["1/2", "0/0"]),
                ("chr1", 3, "A", "G", &["0/1", "0/0"]),
            ],
        );
        let matrix = read_vcf(text.as_bytes()).expect("valid VCF");
        let flags: Vec<bool> = matrix.snps().iter().map(|s| s.biallelic).collect();
        assert_eq!(flags, vec![false, false, true]);
    }

    #[test]
    fn test_gzip_input() {
        let mut encoder = GzEncoder::new(Vec::new(), Compression::default());
        encoder.write_all(five_by_ten_vcf().as_bytes()).unwrap();
        let compressed = encoder.finish().unwrap();

        let matrix = read_vcf(compressed.as_slice()).expect("gzip VCF");
        assert_eq!(matrix.n_samples(), 5);
        assert_eq!(matrix.n_snps(), 10);
    }

    #[test]
    fn test_non_vcf_input_rejected() {
        let result = read_vcf("sample,PC1,PC2\na,0.1,0.2\n".as_bytes());
        assert!(matches!(result, Err(AnalysisError::MalformedInput(_))), "got {:?}", result);

        let result = read_vcf("".as_bytes());
        assert!(matches!(result, Err(AnalysisError::MalformedInput(_))));
    }

    #[test]
    fn test_binary_input_rejected() {
        let bytes: Vec<u8> = vec![b'#', b'#', 0xff, 0xfe, 0x00, b'\n'];
        let result = read_vcf(bytes.as_slice());
        assert!(matches!(result, Err(AnalysisError::MalformedInput(_))), "got {:?}", result);
    }

    #[test]
    fn test_column_count_mismatch_names_line() {
        let mut text = vcf_text(&["a", "b"], &[("chr1", 1, "A", "G", &["0/1", "0/0"])]);
        text.push_str("chr1\t2\t.\tA\tG\t.\tPASS\t.\tGT\t0/1\n");
        match read_vcf(text.as_bytes()) {
            Err(AnalysisError::MalformedInput(msg)) => assert!(msg.contains("line 5"), "message: {}", msg),
            other => panic!("expected MalformedInput, got {:?}", other),
        }
    }

    #[test]
    fn test_header_without_samples_rejected() {
        let text = "#CHROM\tPOS\tID\tREF\tALT\tQUAL\tFILTER\tINFO\nchr1\t1\t.\tA\tG\t.\t.\t.\n";
        assert!(matches!(read_vcf(text.as_bytes()), Err(AnalysisError::MalformedInput(_))));
    }

    #[test]
    fn test_header_only_rejected() {
        let text = vcf_text(&["a", "b"], &[]);
        match read_vcf(text.as_bytes()) {
            Err(AnalysisError::MalformedInput(msg)) => assert!(msg.contains("no variants")),
            other => panic!("expected MalformedInput, got {:?}", other),
        }
    }

    #[test]
    fn test_duplicate_samples_and_snps_rejected() {
        let dup_samples = vcf_text(&["a", "a"], &[("chr1", 1, "A", "G", &["0/1", "0/0"])]);
        assert!(matches!(read_vcf(dup_samples.as_bytes()), Err(AnalysisError::MalformedInput(_))));

        let dup_snps = vcf_text(
            &["a", "b"],
            &[
                ("chr1", 1, "A", "G", &["0/1", "0/0"]),
                ("chr1", 1, "A", "T", &["0/1", "0/0"]),
            ],
        );
        assert!(matches!(read_vcf(dup_snps.as_bytes()), Err(AnalysisError::MalformedInput(_))));
    }

    #[test]
    fn test_invalid_position_and_missing_gt() {
        let mut bad_pos = vcf_text(&["a"], &[]);
        bad_pos.push_str("chr1\tabc\t.\tA\tG\t.\t.\t.\tGT\t0/1\n");
        assert!(matches!(read_vcf(bad_pos.as_bytes()), Err(AnalysisError::MalformedInput(_))));

        let mut no_gt = vcf_text(&["a"], &[]);
        no_gt.push_str("chr1\t1\t.\tA\tG\t.\t.\t.\tDP\t10\n");
        assert!(matches!(read_vcf(no_gt.as_bytes()), Err(AnalysisError::MalformedInput(_))));
    }

    #[test]
    fn test_summarize_vcf() {
        let matrix = read_vcf(five_by_ten_vcf().as_bytes()).unwrap();
        let summary = summarize_vcf(&matrix);
        assert_eq!(summary.samples.len(), 5);
        assert_eq!(summary.total_variants, 10);
        assert_eq!(summary.biallelic_variants, 10);
        assert_eq!(summary.missing_calls, 3);
        assert_eq!(summary.preview.len(), 5);
        assert_eq!(summary.preview[0].pos, 100);
        assert_eq!(summary.preview[0].alternate, "G");
    }
}
