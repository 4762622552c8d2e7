use clap::{Args, Parser, Subcommand};
use ride_common::{ActiveRideId, GeoCoordinates, PendingRideId, RequestId, UserId};

mod commands;
mod formatting;

#[derive(Parser, Debug)]
#[command(version = "0.1.0", about = "Talk to a ride server from the command line")]
pub struct Arguments {
    /// The ride server to talk to. Defaults to RIDE_SERVER_URL, or http://127.0.0.1:8460
    #[arg(short, long, global = true)]
    server: Option<String>,
    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Subcommand)]
pub enum Command {
    /// Submit a new ride request. Pass --seats to offer a ride as a driver
    Submit(SubmitParams),
    /// Print the current status of a request
    Status {
        #[arg(short, long)]
        user: UserId,
        #[arg(required = true, index = 1)]
        request_id: RequestId,
    },
    /// Print the current status of a pending ride
    Pending {
        #[arg(required = true, index = 1)]
        id: PendingRideId,
    },
    /// Print the current status of an active ride
    Active {
        #[arg(required = true, index = 1)]
        id: ActiveRideId,
    },
    /// Follow a request until it expires or its pending ride is confirmed, printing every change
    Watch {
        #[arg(short, long)]
        user: UserId,
        #[arg(required = true, index = 1)]
        request_id: RequestId,
    },
    /// Confirm a pending ride
    Confirm {
        #[arg(short, long)]
        user: UserId,
        #[arg(required = true, index = 1)]
        pending_ride_id: PendingRideId,
    },
    /// Withdraw a request. Withdrawing a matched request cancels its pending ride
    Cancel {
        #[arg(short, long)]
        user: UserId,
        #[arg(required = true, index = 1)]
        request_id: RequestId,
    },
    /// Ask the directions provider for a route, and print each leg
    Route(RouteParams),
}

#[derive(Debug, Args)]
pub struct SubmitParams {
    #[arg(short, long)]
    user: UserId,
    /// Where the trip starts, as 'latitude,longitude'
    #[arg(short, long, allow_hyphen_values = true)]
    origin: GeoCoordinates,
    /// Where the trip ends, as 'latitude,longitude'
    #[arg(short, long, allow_hyphen_values = true)]
    destination: GeoCoordinates,
    /// Offer this many seats as a driver. Without it, the request is for a ride
    #[arg(long)]
    seats: Option<u32>,
}

#[derive(Debug, Args)]
pub struct RouteParams {
    #[arg(required = true, index = 1, allow_hyphen_values = true)]
    origin: GeoCoordinates,
    #[arg(required = true, index = 2, allow_hyphen_values = true)]
    destination: GeoCoordinates,
    /// A stop along the way. May be given more than once; stops are visited in order
    #[arg(short, long = "via", allow_hyphen_values = true)]
    waypoints: Vec<GeoCoordinates>,
}

#[tokio::main]
async fn main() {
    dotenvy::dotenv().ok();
    env_logger::init();
    let cli = Arguments::parse();
    if let Err(e) = commands::handle_command(cli).await {
        eprintln!("{e:#}");
        std::process::exit(1);
    }
}
