use briar::uci;

fn main() {
    uci::run();
}
