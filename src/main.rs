fn main() {
    aw_compile::app::cli::run();
}
