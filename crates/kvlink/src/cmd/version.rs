use crate::cmd::VersionArgs;
use crate::exit::{CliResult, SUCCESS};

pub fn run(args: VersionArgs) -> CliResult<i32> {
    if !args.extended {
        println!("kvlink {}", env!("CARGO_PKG_VERSION"));
        return Ok(SUCCESS);
    }

    println!("name: kvlink");
    println!("version: {}", env!("CARGO_PKG_VERSION"));
    println!(
        "target: {}",
        option_env!("KVLINK_BUILD_TARGET").unwrap_or("unknown")
    );
    println!(
        "profile: {}",
        option_env!("KVLINK_BUILD_PROFILE").unwrap_or("unknown")
    );
    println!("target_os: {}", std::env::consts::OS);
    println!("target_arch: {}", std::env::consts::ARCH);
    println!("git_hash: {}", option_env!("GIT_HASH").unwrap_or("unknown"));
    println!(
        "features: endpoint=true, async={}, cli=true",
        cfg!(feature = "async")
    );
    println!(
        "defaults: workers={}, worker_keep_alive={:?}, max_header={}, max_payload={}",
        kvlink_endpoint::DEFAULT_WORKERS,
        kvlink_endpoint::DEFAULT_WORKER_KEEP_ALIVE,
        kvlink_frame::DEFAULT_MAX_HEADER,
        kvlink_frame::DEFAULT_MAX_PAYLOAD
    );

    Ok(SUCCESS)
}
