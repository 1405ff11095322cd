use std::path::PathBuf;
use std::process::exit;
use clap::Parser;
use tracing::{debug, error, Level};
use study_convert::convert_config::{Config, ConfigFile, ConversionPlan, ConversionSettings};
use study_convert::{BrukerBackend, ConvertError, LoadTiming, StudyConverter, StudyJob};

#[derive(clap::Parser,Debug)]
#[command(name = "study_convert", about = "convert Bruker ParaVision studies to NIfTI")]
pub struct ConvertArgs {
    /// print debug messages
    #[clap(long,short,global = true)]
    verbose:bool,
    #[command(subcommand)]
    action:ConvertAction,
}

#[derive(clap::Subcommand,Debug)]
pub enum ConvertAction {
    /// convert a single study folder
    Convert(ConvertStudyArgs),
    /// list the scans and reconstructions of a study folder
    Inspect(InspectArgs),
    /// convert every study listed in a conversion plan
    Run(RunArgs),
    /// write a conversion plan template to edit for a new set of studies
    NewPlan(NewPlanArgs),
}

#[derive(Clone,clap::Args,Debug)]
pub struct ConvertStudyArgs {
    /// study folder holding the subject file and numbered scans
    source:PathBuf,
    /// output directory. A sub-directory named after the study is created here
    destination:PathBuf,
    /// name used to label outputs. Defaults to the study name recorded by the scanner
    study_name:Option<String>,
    /// open the study while constructing the converter
    #[clap(long)]
    eager:bool,
    /// conversion settings file. Defaults are used if not supplied
    #[clap(long)]
    settings:Option<PathBuf>,
}

#[derive(Clone,clap::Args,Debug)]
pub struct InspectArgs {
    source:PathBuf,
}

#[derive(Clone,clap::Args,Debug)]
pub struct RunArgs {
    /// path to a conversion plan. The file extension is not respected
    plan:PathBuf,
}

#[derive(Clone,clap::Args,Debug)]
pub struct NewPlanArgs {
    /// path to the new plan. The file extension is not respected
    output_plan:PathBuf,
}

fn main() {
    let args = ConvertArgs::parse();
    let level = match args.verbose {
        true => Level::DEBUG,
        false => Level::INFO
    };
    tracing_subscriber::fmt().with_max_level(level).with_target(false).init();

    let result = match args.action {
        ConvertAction::Convert(args) => convert(args),
        ConvertAction::Inspect(args) => inspect(args),
        ConvertAction::Run(args) => run(args),
        ConvertAction::NewPlan(args) => ConversionPlan::default().to_file(&args.output_plan),
    };
    if let Err(e) = result {
        error!("{}",e);
        exit(1);
    }
}

fn convert(args:ConvertStudyArgs) -> Result<(),ConvertError> {
    let settings = match &args.settings {
        Some(file) => ConversionSettings::from_file(file)?,
        None => ConversionSettings::default()
    };
    let timing = match args.eager {
        true => LoadTiming::Eager,
        false => LoadTiming::Lazy
    };
    let job = StudyJob::new(args.source,args.destination,args.study_name.unwrap_or_default());
    let mut converter = StudyConverter::new(job,BrukerBackend::new(settings.options()),timing)?;
    debug!("conversion options: {:?}",converter.backend().options());
    if !converter.is_loaded() {
        converter.load()?;
    }
    converter.convert()
}

fn inspect(args:InspectArgs) -> Result<(),ConvertError> {
    let job = StudyJob::new(args.source,PathBuf::new(),"");
    let converter = StudyConverter::new(job,BrukerBackend::default(),LoadTiming::Eager)?;
    let handle = match converter.handle() {
        Some(handle) => handle,
        None => return Err(ConvertError::NotLoaded{study_name:String::new()})
    };
    let study = handle.study();
    println!("study: {}",handle.study_name());
    if let Some(id) = study.subject_id() {
        println!("subject: {}",id);
    }
    for scan in study.scans() {
        let recos:Vec<u32> = scan.reconstructions.iter().map(|r| r.number).collect();
        println!("scan {:>3}  {:<24} reconstructions: {}",
                 scan.number,
                 scan.method_name().unwrap_or_else(|| String::from("unknown method")),
                 utils::vec_to_string(&recos));
    }
    Ok(())
}

fn run(args:RunArgs) -> Result<(),ConvertError> {
    let plan = ConversionPlan::from_file(&args.plan)?;
    let done = plan.run()?;
    println!("converted {} studies",done.len());
    Ok(())
}
