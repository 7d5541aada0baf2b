//! Prints the CustomResourceDefinitions for all record kinds as YAML, for
//! applying to the cluster or committing to a deploy manifest.

use kube::CustomResourceExt;

fn main() {
    let definitions = [
        crds::Pool::crd(),
        crds::Network::crd(),
        crds::Lease::crd(),
    ];
    for crd in definitions {
        println!("---");
        print!(
            "{}",
            serde_yaml::to_string(&crd).expect("static CRD definition serializes")
        );
    }
}
