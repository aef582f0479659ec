mod qc_tests;
mod vcf_tests;

/// Variant row for `vcf_text`: chrom, pos, ref, alt and one GT per sample.
pub(crate) type VcfRow<'a> = (&'a str, i64, &'a str, &'a str, &'a [&'a str]);

/// Builds an in-memory VCF with a GT-only FORMAT column.
pub(crate) fn vcf_text(samples: &[&str], rows: &[VcfRow]) -> String {
    let mut text = String::from("##fileformat=VCFv4.2\n");
    text.push_str("##FORMAT=<ID=GT,Number=1,Type=String,Description=\"Genotype\">\n");
    text.push_str("#CHROM\tPOS\tID\tREF\tALT\tQUAL\tFILTER\tINFO\tFORMAT");
    for s in samples {
        text.push('\t');
        text.push_str(s);
    }
    text.push('\n');
    for (chrom, pos, reference, alt, gts) in rows {
        text.push_str(&format!("{}\t{}\t.\t{}\t{}\t50\tPASS\t.\tGT", chrom, pos, reference, alt));
        for gt in gts.iter() {
            text.push('\t');
            text.push_str(gt);
        }
        text.push('\n');
    }
    text
}

/// Five samples, ten SNPs: SNP 9 is 40% missing, SNP 10 is monomorphic,
/// SNP 5 sits exactly at 20% missing.
pub(crate) fn five_by_ten_vcf() -> String {
    vcf_text(
        &["s1", "s2", "s3", "s4", "s5"],
        &[
            ("chr1", 100, "A", "G", &["0/0", "0/1", "1/1", "0/1", "0/0"]),
            ("chr1", 200, "C", "T", &["0/1", "0/0", "0/1", "1/1", "0/0"]),
            ("chr1", 300, "G", "A", &["1/1", "0/1", "0/0", "0/0", "0/1"]),
            ("chr1", 400, "T", "C", &["0/0", "0/0", "0/1", "0/1", "1/1"]),
            ("chr1", 500, "A", "C", &["0/1", "1/1", "0/0", "0/1", "./."]),
            ("chr2", 100, "G", "T", &["0/0", "0/1", "0/1", "0/0", "1/1"]),
            ("chr2", 200, "C", "G", &["1/1", "0/0", "0/1", "0/1", "0/0"]),
            ("chr2", 300, "T", "A", &["0/1", "0/1", "0/0", "1/1", "0/1"]),
            ("chr2", 400, "A", "T", &["./.", "0/1", "./.", "0/0", "0/1"]),
            ("chr2", 500, "C", "A", &["0/0", "0/0", "0/0", "0/0", "0/0"]),
        ],
    )
}

/// Three pools; the SNP at position 300 has only 8 reads in pool A.
pub(crate) fn three_pool_depths() -> String {
    "\
chrom\tpos\treference_count_A\tpool_depth_A\treference_count_B\tpool_depth_B\treference_count_C\tpool_depth_C
chr1\t100\t20\t20\t0\t20\t10\t20
chr1\t200\t10\t20\t10\t20\t10\t20
chr1\t300\t5\t8\t4\t30\t3\t30
chr1\t400\t15\t30\t12\t30\t0\t30
"
    .to_string()
}
