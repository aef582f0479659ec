use anyhow::{bail, Context};
use clap::{Args, Parser, Subcommand};
use colored::Colorize;
use env_logger::Builder;
use human_bytes::human_bytes;
use log::{info, LevelFilter};
use rayon::ThreadPoolBuilder;
use std::fs;
use std::path::{Path, PathBuf};

use radpop::error::{PipelineError, ProcessingStage};
use radpop::export::{write_fst_file, write_pca_file, write_snp_list_file};
use radpop::fst::{FstEstimator, FstMatrix};
use radpop::import::{open_admixture_q, open_pca_table};
use radpop::params::{FstParams, PcaParams};
use radpop::pca::Scaling;
use radpop::pipeline::{run_fst_pipeline_file, run_pca_pipeline_file, PcaReport};
use radpop::progress::{create_spinner, display_status_box, StatusBox};
use radpop::qc::QcThresholds;
use radpop::report::render_insights;
use radpop::vcf::{open_vcf, summarize_vcf};

#[derive(Parser, Debug)]
#[command(author, version, about = "PCA and pooled FST for RAD-seq population genetics", long_about = None)]
struct Cli {
    /// Worker threads for parallel steps
    #[arg(long = "threads", global = true, default_value_t = num_cpus::get())]
    threads: usize,

    /// Log level: error, warn, info, debug or trace
    #[arg(long = "log_level", global = true, default_value = "info")]
    log_level: String,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// QC-filter a VCF and run PCA on the retained genotypes
    Pca(PcaArgs),
    /// Pairwise FST between pools from a reference/alternate depth table
    Fst(FstArgs),
    /// Print a short summary of a VCF without filtering
    Inspect {
        /// VCF or VCF.gz file
        #[arg(long = "vcf")]
        vcf: PathBuf,
    },
    /// Validate a precomputed PCA table or ADMIXTURE Q file
    Import(ImportArgs),
}

#[derive(Args, Debug)]
struct PcaArgs {
    /// VCF or VCF.gz file
    #[arg(long = "vcf")]
    vcf: PathBuf,

    /// Output .pca file
    #[arg(short, long = "output")]
    output: PathBuf,

    /// Minimum minor allele frequency
    #[arg(long = "min_maf", default_value_t = 0.05)]
    min_maf: f64,

    /// Maximum missing rate per SNP
    #[arg(long = "max_missing_snp", default_value_t = 0.2)]
    max_missing_snp: f64,

    /// Maximum missing rate per sample
    #[arg(long = "max_missing_sample", default_value_t = 0.2)]
    max_missing_sample: f64,

    /// Number of principal components
    #[arg(long = "components", default_value_t = 3)]
    components: usize,

    /// Column scaling: standardize, patterson or center
    #[arg(long = "scaling", default_value = "standardize")]
    scaling: String,

    /// Also write the retained SNPs to <output>.snps.tsv
    #[arg(long = "write_snps")]
    write_snps: bool,

    /// Write a markdown QC and PCA summary here
    #[arg(long = "report")]
    report: Option<PathBuf>,
}

#[derive(Args, Debug)]
struct FstArgs {
    /// Pooled depth table (reference_count_<pool>, pool_depth_<pool> columns)
    #[arg(long = "depths")]
    depths: PathBuf,

    /// Output CSV file
    #[arg(short, long = "output")]
    output: PathBuf,

    /// Minimum read depth every pool must reach at a SNP
    #[arg(long = "min_pool_depth", default_value_t = 10)]
    min_pool_depth: u32,

    /// FST estimator: hudson or wc
    #[arg(long = "estimator", default_value = "hudson")]
    estimator: String,
}

#[derive(Args, Debug)]
#[group(required = true, multiple = false)]
struct ImportArgs {
    /// PCA coordinate table (.evec, .eigenvec, .pca, csv)
    #[arg(long = "pca")]
    pca: Option<PathBuf>,

    /// ADMIXTURE .Q file
    #[arg(long = "admixture")]
    admixture: Option<PathBuf>,
}

fn main() {
    if let Err(err) = run() {
        eprintln!("{} {}", "Error:".red().bold(), error_message(&err));
        std::process::exit(1);
    }
}

/// Joins the error chain, skipping causes the outer message already quotes.
fn error_message(err: &anyhow::Error) -> String {
    let mut message = err.to_string();
    for cause in err.chain().skip(1) {
        let cause = cause.to_string();
        if !message.contains(&cause) {
            message.push_str(": ");
            message.push_str(&cause);
        }
    }
    message
}

fn run() -> anyhow::Result<()> {
    let cli = Cli::parse();

    let log_level = cli.log_level.parse::<LevelFilter>().unwrap_or_else(|_| {
        eprintln!(
            "Warning: Invalid log level '{}' provided. Defaulting to Info.",
            cli.log_level
        );
        LevelFilter::Info
    });
    Builder::new().filter_level(log_level).init();

    ThreadPoolBuilder::new()
        .num_threads(cli.threads.max(1))
        .build_global()
        .context("failed to configure the thread pool")?;
    info!("Using {} threads", cli.threads.max(1));

    match cli.command {
        Command::Pca(args) => run_pca(&args),
        Command::Fst(args) => run_fst(&args),
        Command::Inspect { vcf } => run_inspect(&vcf),
        Command::Import(args) => run_import(&args),
    }
}

fn log_input(path: &Path) -> anyhow::Result<()> {
    let metadata = fs::metadata(path).with_context(|| format!("cannot read {}", path.display()))?;
    info!("Input: {} ({})", path.display(), human_bytes(metadata.len() as f64));
    Ok(())
}

/// `<output>.snps.tsv`, next to the .pca file.
fn snp_list_path(output: &Path) -> PathBuf {
    let mut name = output.as_os_str().to_owned();
    name.push(".snps.tsv");
    PathBuf::from(name)
}

fn run_pca(args: &PcaArgs) -> anyhow::Result<()> {
    let scaling: Scaling = args.scaling.parse()?;
    let qc = QcThresholds::new(args.min_maf, args.max_missing_snp, args.max_missing_sample)?;
    let params = PcaParams::new(qc, args.components, scaling)?;

    log_input(&args.vcf)?;

    let spinner = create_spinner("Running QC and PCA");
    let result = run_pca_pipeline_file(&args.vcf, &params);
    spinner.finish_and_clear();
    let report = result?;

    display_qc_status(&report);
    display_pca_status(&report);

    write_pca_file(&report.pca, &args.output)
        .map_err(|e| PipelineError::new(ProcessingStage::Export, e))?;
    if args.write_snps {
        write_snp_list_file(&report.snps, &snp_list_path(&args.output))
            .map_err(|e| PipelineError::new(ProcessingStage::Export, e))?;
    }
    if let Some(report_path) = &args.report {
        fs::write(report_path, render_insights(&report))
            .map_err(|e| PipelineError::new(ProcessingStage::Export, e.into()))?;
        info!("Summary written to {}", report_path.display());
    }

    println!("{}", "PCA complete.".green());
    Ok(())
}

fn display_qc_status(report: &PcaReport) {
    let qc = &report.qc;
    display_status_box(StatusBox {
        title: "Quality control".to_string(),
        stats: vec![
            (
                "Samples retained".to_string(),
                format!("{} / {} ({:.1}%)", qc.samples_after, qc.samples_before, qc.sample_retention_pct()),
            ),
            (
                "SNPs retained".to_string(),
                format!("{} / {} ({:.1}%)", qc.snps_after, qc.snps_before, qc.snp_retention_pct()),
            ),
            ("Multi-allelic removed".to_string(), qc.snps_removed_multiallelic.to_string()),
            ("Missingness removed".to_string(), qc.snps_removed_missing.to_string()),
            ("Low MAF removed".to_string(), qc.snps_removed_maf.to_string()),
            ("Samples removed".to_string(), qc.samples_removed_missing.to_string()),
        ],
    });
}

fn display_pca_status(report: &PcaReport) {
    let pca = &report.pca;
    let mut stats = vec![(
        "Components".to_string(),
        format!("{} (requested {})", pca.component_count, pca.requested_components),
    )];
    for (i, ratio) in pca.explained_variance_ratio.iter().enumerate() {
        stats.push((format!("PC{} variance", i + 1), format!("{:.2}%", ratio * 100.0)));
    }
    stats.push((
        "Cumulative".to_string(),
        format!("{:.2}%", pca.cumulative_variance_ratio(pca.component_count) * 100.0),
    ));
    display_status_box(StatusBox {
        title: "PCA".to_string(),
        stats,
    });
}

fn run_fst(args: &FstArgs) -> anyhow::Result<()> {
    let estimator: FstEstimator = args.estimator.parse()?;
    let params = FstParams::new(args.min_pool_depth, estimator);

    log_input(&args.depths)?;

    let spinner = create_spinner("Computing pairwise FST");
    let result = run_fst_pipeline_file(&args.depths, &params);
    spinner.finish_and_clear();
    let matrix = result?;

    display_fst_status(&matrix);
    write_fst_file(&matrix, &args.output).map_err(|e| PipelineError::new(ProcessingStage::Export, e))?;

    println!("{}", "FST complete.".green());
    Ok(())
}

fn display_fst_status(matrix: &FstMatrix) {
    let mut stats = vec![
        ("Estimator".to_string(), matrix.estimator.to_string()),
        ("Pools".to_string(), matrix.n_pools().to_string()),
        (
            "SNPs used".to_string(),
            format!("{} / {}", matrix.snp_count_after_depth_filter, matrix.snp_count_input),
        ),
    ];
    for pair in &matrix.pairs {
        let value = match pair.fst {
            Some(v) => format!("{:.4} ({} SNPs)", v, pair.informative_snps),
            None => "NA".to_string(),
        };
        stats.push((
            format!("{} vs {}", matrix.pool_ids[pair.pool_a], matrix.pool_ids[pair.pool_b]),
            value,
        ));
    }
    display_status_box(StatusBox {
        title: "Pairwise FST".to_string(),
        stats,
    });
}

fn run_inspect(vcf: &Path) -> anyhow::Result<()> {
    log_input(vcf)?;
    let genotypes = open_vcf(vcf).map_err(|e| PipelineError::new(ProcessingStage::Parsing, e))?;
    let summary = summarize_vcf(&genotypes);

    let mut stats = vec![
        ("Samples".to_string(), summary.samples.len().to_string()),
        ("Variants".to_string(), summary.total_variants.to_string()),
        ("Biallelic".to_string(), summary.biallelic_variants.to_string()),
        ("Missing calls".to_string(), summary.missing_calls.to_string()),
    ];
    for variant in &summary.preview {
        stats.push((
            format!("{}:{}", variant.chrom, variant.pos),
            format!("{} > {}", variant.reference, variant.alternate),
        ));
    }
    display_status_box(StatusBox {
        title: format!("VCF summary: {}", vcf.display()),
        stats,
    });
    Ok(())
}

fn run_import(args: &ImportArgs) -> anyhow::Result<()> {
    if let Some(path) = &args.pca {
        let table = open_pca_table(path).map_err(|e| PipelineError::new(ProcessingStage::Parsing, e))?;
        display_status_box(StatusBox {
            title: format!("PCA table: {}", path.display()),
            stats: vec![
                ("Rows".to_string(), table.values.nrows().to_string()),
                ("Components".to_string(), table.values.ncols().to_string()),
                ("Labelled".to_string(), table.labels.is_some().to_string()),
            ],
        });
    } else if let Some(path) = &args.admixture {
        let q = open_admixture_q(path).map_err(|e| PipelineError::new(ProcessingStage::Parsing, e))?;
        display_status_box(StatusBox {
            title: format!("ADMIXTURE proportions: {}", path.display()),
            stats: vec![
                ("Individuals".to_string(), q.values.nrows().to_string()),
                ("Clusters (K)".to_string(), q.values.ncols().to_string()),
            ],
        });
    } else {
        bail!("either --pca or --admixture must be given");
    }
    println!("{}", "Import valid.".green());
    Ok(())
}
