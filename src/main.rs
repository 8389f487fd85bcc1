fn main() {
    goldgen::cli::run();
}
