use indicatif::{style::TemplateError, ProgressBar, ProgressDrawTarget, ProgressStyle};

pub const TEMPLATE: &str = "[{bar:60}] {percent:>3}% {pos}/{len}";

pub fn progress_bar(total: u64, target: ProgressDrawTarget) -> Result<ProgressBar, TemplateError> {
    let bar = ProgressBar::with_draw_target(Some(total), target);
    bar.set_style(
        ProgressStyle::default_bar()
            .template(TEMPLATE)?
            .progress_chars("= "),
    );
    Ok(bar)
}
