fn main() -> Result<(), Box<dyn std::error::Error>> {
    stemdeck::runtime::run()
}
