use std::env;

fn main() {
    // Get the derivative feature selected by the user
    let mut derivatives: Vec<_> = env::vars()
        .filter_map(|(key, _value)| {
            if key.starts_with("CARGO_FEATURE_MPC") {
                // strip 'CARGO_FEATURE_' and convert to lowercase
                Some(key[14..].to_lowercase())
            } else {
                None
            }
        })
        .collect();
    if derivatives.len() > 1 {
        panic!("More than one derivative feature selected: {:?}", derivatives);
    }

    println!("cargo:rustc-check-cfg=cfg(decorated_storage)");
    match derivatives.pop().as_deref() {
        Some("mpc5748g") | Some("mpc5775b") => {
            // Both derivatives share the e200z4/z7 decorated storage controller.
            if env::var("CARGO_CFG_TARGET_ARCH").as_deref() == Ok("powerpc") {
                println!("cargo:rustc-cfg=decorated_storage");
            }
        }
        Some(other) => {
            panic!("Unknown derivative feature: {:?}", other);
        }
        None => {}
    }

    println!("cargo:rerun-if-changed=build.rs");
}
