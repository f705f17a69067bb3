use crate::config::load_config;
use crate::container::BoxContainer;
use crate::data_source::{MemoryDataSource, generate_box_sizes, generate_data_items};
use crate::diagram::Diagram;
use crate::layout::{VisualTree, compute_branch_visual_bounding_rect};
use crate::stepping::{
    LayoutEvent, RunOutcome, StepHandle, SteppingCoordinator, SteppingOptions,
};
use anyhow::Result;
use clap::Parser;
use std::io::{self, BufRead, Write};
use std::path::PathBuf;

#[derive(Parser, Debug)]
#[command(name = "orgchart", version, about = "Org chart layout demo with interactive stepping")]
pub struct Args {
    /// Number of generated data items
    #[arg(short = 'n', long = "items", default_value_t = 200)]
    pub items: usize,

    /// Seed for the generated hierarchy and box sizes
    #[arg(short = 's', long = "seed", default_value_t = 1)]
    pub seed: u64,

    /// Layout config file (JSON or JSON5)
    #[arg(short = 'c', long = "configFile")]
    pub config: Option<PathBuf>,

    /// Pause at every boundary change; Enter advances, `q` cancels
    #[arg(short = 'i', long = "interactive")]
    pub interactive: bool,

    /// Strategy id applied to the first generated box
    #[arg(long = "strategy")]
    pub strategy: Option<String>,
}

pub fn run() -> Result<()> {
    let args = Args::parse();
    let settings = load_config(args.config.as_deref())?;

    let mut source = MemoryDataSource::new();
    generate_data_items(&mut source, args.items, args.seed);
    let sizes = generate_box_sizes(&source, args.seed);

    let mut boxes = BoxContainer::from_source(&source)?;
    if let Some(strategy) = args.strategy {
        if !settings.strategies.contains_key(&strategy) {
            return Err(anyhow::anyhow!("unknown strategy {strategy:?}"));
        }
        if let Some(first) = boxes.by_data_id_mut("1") {
            first.layout_strategy_id = Some(strategy);
        }
    }

    let options = SteppingOptions {
        interactive: args.interactive,
        ..SteppingOptions::default()
    };
    let mut coordinator = SteppingCoordinator::new(options);
    let run = coordinator.start(
        Diagram::new(boxes, settings),
        Some(Box::new(move |data_id: &str| sizes.get(data_id).copied())),
    )?;

    let stepper = coordinator.step_handle();
    let mut boundary_events = 0usize;
    for event in run.events() {
        match event {
            LayoutEvent::OperationChanged { operation, .. } => println!("== {operation}"),
            LayoutEvent::BoundaryChanged {
                operation,
                boundary,
                ..
            } => {
                boundary_events += 1;
                let rect = boundary.bounding_rect().unwrap_or_default();
                println!(
                    "  [{operation}] boundary #{boundary_events}: {} steps, x {:.1}..{:.1}, y {:.1}..{:.1}",
                    boundary.left.len(),
                    rect.left,
                    rect.right(),
                    rect.top,
                    rect.bottom()
                );
                // the first pause is pre-acknowledged
                if args.interactive && boundary_events > 1 {
                    prompt(stepper.as_ref())?;
                }
            }
        }
    }

    match run.wait() {
        RunOutcome::Completed(diagram) => {
            print_boxes(&diagram)?;
            Ok(())
        }
        RunOutcome::Cancelled => {
            println!("layout cancelled");
            Ok(())
        }
        RunOutcome::Failed(err) => Err(err.into()),
    }
}

fn prompt(stepper: Option<&StepHandle>) -> Result<()> {
    let Some(stepper) = stepper else {
        return Ok(());
    };
    print!("  [Enter] advance, [q] cancel > ");
    io::stdout().flush()?;
    let mut line = String::new();
    io::stdin().lock().read_line(&mut line)?;
    if line.trim().eq_ignore_ascii_case("q") {
        stepper.cancel();
    } else {
        stepper.advance();
    }
    Ok(())
}

fn print_boxes(diagram: &Diagram) -> Result<()> {
    let tree = VisualTree::build(&diagram.boxes)?;
    let bounds = compute_branch_visual_bounding_rect(&tree, &diagram.boxes);
    let mut out = io::stdout().lock();
    writeln!(
        out,
        "chart {:.1} x {:.1} at ({:.1}, {:.1})",
        bounds.width, bounds.height, bounds.left, bounds.top
    )?;
    for idx in tree.pre_order() {
        let node = tree.node(idx);
        let Some(chart_box) = diagram.boxes.get(node.box_id) else {
            continue;
        };
        if chart_box.is_special {
            continue;
        }
        let frame = &chart_box.frame.exterior;
        writeln!(
            out,
            "{:indent$}{} ({}) x={:.1} y={:.1} w={:.1} h={:.1}",
            "",
            chart_box.id,
            chart_box.data_id.as_deref().unwrap_or("-"),
            frame.left,
            frame.top,
            frame.width,
            frame.height,
            indent = (node.level - 1) * 2
        )?;
    }
    Ok(())
}
