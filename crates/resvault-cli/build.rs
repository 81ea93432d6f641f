use vergen_git2::{BuildBuilder, CargoBuilder, Emitter, Git2Builder, RustcBuilder};

/// Emits the VERGEN_* variables read by `version_info()`.
fn main() -> Result<(), Box<dyn std::error::Error>> {
    let build_date = BuildBuilder::default().build_date(true).build()?;
    let target_triple = CargoBuilder::default().target_triple(true).build()?;
    let git_sha = Git2Builder::default().sha(true).build()?;
    let rustc_semver = RustcBuilder::default().semver(true).build()?;

    Emitter::default()
        .add_instructions(&build_date)?
        .add_instructions(&target_triple)?
        .add_instructions(&git_sha)?
        .add_instructions(&rustc_semver)?
        .emit()?;

    Ok(())
}
