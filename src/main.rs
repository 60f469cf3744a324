// ncvm main program

fn main() {
    ncvm::repl::run();
}
