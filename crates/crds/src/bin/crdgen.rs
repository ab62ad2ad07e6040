//! Prints the NeutronSriovAgent CRD manifest as YAML.
//!
//! Usage: `cargo run -p crds --bin crdgen > config/crd/neutronsriovagents.yaml`

use crds::NeutronSriovAgent;
use kube::CustomResourceExt;

fn main() -> Result<(), serde_yaml::Error> {
    print!("{}", serde_yaml::to_string(&NeutronSriovAgent::crd())?);
    Ok(())
}
