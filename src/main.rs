fn main() {
    adze::cli::run();
}
