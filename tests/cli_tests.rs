// tests/cli_tests.rs

use assert_cmd::prelude::*;
use predicates::prelude::*;
use std::fs;
use std::process::Command;
use tempfile::tempdir;

const VCF: &str = "\
##fileformat=VCFv4.2
##FORMAT=<ID=GT,Number=1,Type=String,Description=\"Genotype\">
#CHROM\tPOS\tID\tREF\tALT\tQUAL\tFILTER\tINFO\tFORMAT\ts1\ts2\ts3\ts4\ts5
chr1\t100\t.\tA\tG\t50\tPASS\t.\tGT\t0/0\t0/1\t1/1\t0/1\t0/0
chr1\t200\t.\tC\tT\t50\tPASS\t.\tGT\t0/1\t0/0\t0/1\t1/1\t0/0
chr1\t300\t.\tG\tA\t50\tPASS\t.\tGT\t1/1\t0/1\t0/0\t0/0\t0/1
chr1\t400\t.\tT\tC\t50\tPASS\t.\tGT\t0/0\t0/0\t0/1\t0/1\t1/1
chr1\t500\t.\tA\tC\t50\tPASS\t.\tGT\t0/1\t1/1\t0/0\t0/1\t./.
chr2\t100\t.\tG\tT\t50\tPASS\t.\tGT\t0/0\t0/1\t0/1\t0/0\t1/1
chr2\t200\t.\tC\tG\t50\tPASS\t.\tGT\t1/1\t0/0\t0/1\t0/1\t0/0
chr2\t300\t.\tT\tA\t50\tPASS\t.\tGT\t0/1\t0/1\t0/0\t1/1\t0/1
chr2\t400\t.\tA\tT\t50\tPASS\t.\tGT\t./.\t0/1\t./.\t0/0\t0/1
chr2\t500\t.\tC\tA\t50\tPASS\t.\tGT\t0/0\t0/0\t0/0\t0/0\t0/0
";

const DEPTHS: &str = "\
chrom\tpos\treference_count_A\tpool_depth_A\treference_count_B\tpool_depth_B\treference_count_C\tpool_depth_C
chr1\t100\t20\t20\t0\t20\t10\t20
chr1\t200\t10\t20\t10\t20\t10\t20
chr1\t300\t5\t8\t4\t30\t3\t30
chr1\t400\t15\t30\t12\t30\t0\t30
";

#[test]
fn test_pca_command_writes_outputs() -> Result<(), Box<dyn std::error::Error>> {
    let dir = tempdir()?;
    let vcf_path = dir.path().join("input.vcf");
    let output_path = dir.path().join("result.pca");
    let report_path = dir.path().join("summary.md");
    fs::write(&vcf_path, VCF)?;

    let mut cmd = Command::cargo_bin("radpop")?;
    cmd.arg("--threads")
        .arg("2")
        .arg("pca")
        .arg("--vcf")
        .arg(&vcf_path)
        .arg("--output")
        .arg(&output_path)
        .arg("--components")
        .arg("2")
        .arg("--write_snps")
        .arg("--report")
        .arg(&report_path);
    cmd.assert()
        .success()
        .stdout(predicate::str::contains("PCA complete."));

    let pca = fs::read_to_string(&output_path)?;
    let lines: Vec<&str> = pca.lines().collect();
    assert_eq!(lines[0], "sample\tPC1\tPC2");
    assert_eq!(lines.len(), 7);
    assert!(lines[6].starts_with("explained_variance_ratio\t"));

    let snps = fs::read_to_string(dir.path().join("result.pca.snps.tsv"))?;
    assert_eq!(snps.lines().count(), 9);

    let report = fs::read_to_string(&report_path)?;
    assert!(report.contains("### Quality control summary"));
    assert!(report.contains("### PCA results"));
    Ok(())
}

#[test]
fn test_pca_command_rejects_non_vcf() -> Result<(), Box<dyn std::error::Error>> {
    let dir = tempdir()?;
    let input = dir.path().join("notes.txt");
    fs::write(&input, "this is not a VCF file\n")?;

    let mut cmd = Command::cargo_bin("radpop")?;
    cmd.arg("pca")
        .arg("--vcf")
        .arg(&input)
        .arg("--output")
        .arg(dir.path().join("out.pca"));
    cmd.assert()
        .failure()
        .stderr(predicate::str::contains("parsing failed"));
    assert!(!dir.path().join("out.pca").exists());
    Ok(())
}

#[test]
fn test_pca_command_rejects_bad_thresholds() -> Result<(), Box<dyn std::error::Error>> {
    let dir = tempdir()?;
    let vcf_path = dir.path().join("input.vcf");
    fs::write(&vcf_path, VCF)?;

    let mut cmd = Command::cargo_bin("radpop")?;
    cmd.arg("pca")
        .arg("--vcf")
        .arg(&vcf_path)
        .arg("--output")
        .arg(dir.path().join("out.pca"))
        .arg("--min_maf")
        .arg("1.5");
    cmd.assert()
        .failure()
        .stderr(predicate::str::contains("min_maf"));
    Ok(())
}

#[test]
fn test_fst_command_writes_matrix() -> Result<(), Box<dyn std::error::Error>> {
    let dir = tempdir()?;
    let depth_path = dir.path().join("depths.tsv");
    let output_path = dir.path().join("fst.csv");
    fs::write(&depth_path, DEPTHS)?;

    let mut cmd = Command::cargo_bin("radpop")?;
    cmd.arg("fst")
        .arg("--depths")
        .arg(&depth_path)
        .arg("--output")
        .arg(&output_path)
        .arg("--min_pool_depth")
        .arg("10");
    cmd.assert().success();

    let csv = fs::read_to_string(&output_path)?;
    let lines: Vec<&str> = csv.lines().collect();
    assert_eq!(lines[0], "pool,A,B,C");
    assert_eq!(lines.len(), 4);
    assert!(lines[1].starts_with("A,0.000000,"));
    Ok(())
}

#[test]
fn test_fst_command_empty_after_depth_filter() -> Result<(), Box<dyn std::error::Error>> {
    let dir = tempdir()?;
    let depth_path = dir.path().join("depths.tsv");
    fs::write(&depth_path, DEPTHS)?;

    let mut cmd = Command::cargo_bin("radpop")?;
    cmd.arg("fst")
        .arg("--depths")
        .arg(&depth_path)
        .arg("--output")
        .arg(dir.path().join("fst.csv"))
        .arg("--min_pool_depth")
        .arg("100");
    cmd.assert()
        .failure()
        .stderr(predicate::str::contains("computation failed"));
    Ok(())
}

#[test]
fn test_inspect_and_import_commands() -> Result<(), Box<dyn std::error::Error>> {
    let dir = tempdir()?;
    let vcf_path = dir.path().join("input.vcf");
    fs::write(&vcf_path, VCF)?;

    Command::cargo_bin("radpop")?
        .arg("inspect")
        .arg("--vcf")
        .arg(&vcf_path)
        .assert()
        .success()
        .stdout(predicate::str::contains("chr1:100"));

    let good_q = dir.path().join("good.Q");
    fs::write(&good_q, "0.25 0.75\n0.6 0.4\n")?;
    Command::cargo_bin("radpop")?
        .arg("import")
        .arg("--admixture")
        .arg(&good_q)
        .assert()
        .success();

    let bad_q = dir.path().join("bad.Q");
    fs::write(&bad_q, "0.25 0.25\n0.6 0.4\n")?;
    Command::cargo_bin("radpop")?
        .arg("import")
        .arg("--admixture")
        .arg(&bad_q)
        .assert()
        .failure()
        .stderr(predicate::str::contains("sum to 1"));
    Ok(())
}
