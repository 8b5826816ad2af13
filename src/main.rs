use anyhow::{Context, Result};
use clap::Parser;
use dcf_provision::context::DEFAULT_INIT_PASSWORD;
use dcf_provision::provision::{
    GsInitdb, HostPlatform, LocalFilesystem, LocalPackage, PackageFetcher, RemotePackage,
    SystemPrincipals,
};
use dcf_provision::{
    Collaborators, ProvisioningPipeline, RunContext, SystemAddressProbe, TopologyDescriptor,
    TransportSecurity, plan_local_node,
};
use env_logger::Env;
use log::error;
use std::path::PathBuf;
use std::process::ExitCode;

/// Install openGauss on this host as one node of a DCF-mode cluster.
#[derive(Debug, Parser)]
#[command(name = "dcf-provision", version, disable_version_flag = true)]
struct Args {
    /// Cluster topology descriptor (JSON)
    #[arg(short = 'c', long = "config")]
    config: PathBuf,

    /// Install package on local disk [downloaded when absent]
    #[arg(long)]
    tarball: Option<PathBuf>,

    /// Skip TLS certificate verification when downloading the package
    #[arg(long)]
    insecure_transport: bool,

    /// Initial database password passed to gs_initdb
    #[arg(long, env = "DCF_INIT_PASSWORD", default_value = DEFAULT_INIT_PASSWORD, hide_default_value = true)]
    init_password: String,

    /// Print version
    #[arg(short = 'v', long = "version", action = clap::ArgAction::Version)]
    version: Option<bool>,
}

fn main() -> ExitCode {
    env_logger::Builder::from_env(Env::default().default_filter_or("info"))
        .format_target(false)
        .init();

    let args = match Args::try_parse() {
        Ok(args) => args,
        Err(e) => {
            let _ = e.print();
            return if e.use_stderr() {
                ExitCode::FAILURE
            } else {
                ExitCode::SUCCESS
            };
        }
    };

    match run(args) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            error!("{:#}", e);
            ExitCode::FAILURE
        }
    }
}

fn run(args: Args) -> Result<()> {
    let transport = if args.insecure_transport {
        TransportSecurity::Insecure
    } else {
        TransportSecurity::Verified
    };
    let ctx = RunContext::for_local_host()?
        .transport(transport)
        .init_password(args.init_password);

    let topology = TopologyDescriptor::load(&args.config)
        .with_context(|| format!("loading '{}'", args.config.display()))?;
    let plan = plan_local_node(&topology, &SystemAddressProbe::new(), &ctx)?;

    let package: Box<dyn PackageFetcher> = match args.tarball {
        Some(path) => Box::new(LocalPackage::new(path)),
        None => {
            let platform = HostPlatform::detect();
            log::info!(
                "machine type: {}, distribution: {}",
                platform.arch,
                platform.distribution
            );
            Box::new(RemotePackage::new(platform.package_url()?, ctx.transport))
        }
    };

    let mut pipeline = ProvisioningPipeline::new(
        plan,
        Collaborators {
            package,
            filesystem: Box::new(LocalFilesystem),
            principals: Box::new(SystemPrincipals),
            database: Box::new(GsInitdb),
        },
    );
    pipeline.run()?;
    Ok(())
}
