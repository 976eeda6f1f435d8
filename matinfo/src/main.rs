use crate::tool::{MatInfo, Report};
use common::tool::Tool;
use std::path::PathBuf;
use structopt::StructOpt;

mod tool;

#[derive(StructOpt, Debug)]
#[structopt(name = "matinfo")]
pub struct MatInfoParameters {
    /// Content root to scan for assets. Defaults to the first root of the
    /// content settings.
    #[structopt(short, long, parse(from_os_str))]
    root: Option<PathBuf>,

    /// Url of the descriptor relative to the root
    #[structopt(short, long)]
    input: String,

    /// Read the input as an animation descriptor
    #[structopt(short, long)]
    animation: bool,
}

fn main() {
    simple_logger::init().unwrap();

    let params = MatInfoParameters::from_args();
    let report = MatInfo.execute(params).expect("cannot open descriptor!");

    match report {
        Report::Material(m) => {
            println!("url={}", m.url);
            println!("state={:?}", m.state);
            println!("shading_model={:?}", m.shading_model);
            for (name, value) in m.uniforms.iter() {
                println!("param {}={}", name, value);
            }
            for name in m.unresolved.iter() {
                println!("unresolved {}", name);
            }
            println!("pending={}", m.pending);
            println!("bindings={}", m.bindings);
            println!("assets={}", m.assets);
            println!(
                "initialize={}x avg={}us",
                m.initializations.runs(),
                m.initializations.avg_time().as_micros()
            );
        }
        Report::Animation(a) => {
            println!("name={}", a.name);
            println!("duration={}", a.duration);
            for node in a.nodes.iter() {
                println!("node {} keys={}", node.name, node.keys.len());
            }
        }
    }
}
