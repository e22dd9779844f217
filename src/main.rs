use clap::{CommandFactory, Parser, Subcommand};
use clap_complete::{generate, Shell};
use log::{error, info};
use neon_field::camera::Viewport;
use neon_field::contact::{ContactError, ContactForm, CONTACT_ENDPOINT};
use neon_field::headless::{self, HeadlessOptions};
use neon_field::state::{self, RunOptions};
use neon_field::FieldParams;
use std::io;
use std::process::ExitCode;

/// Mouse-reactive neon particle field with pulsing wireframe shells
#[derive(Parser, Debug)]
#[command(version, about, long_about = None)]
struct Args {
  /// Number of particles (defaults to 500, or 150 on narrow windows)
  #[arg(short, long)]
  particles: Option<u32>,
  /// Seed for the initial particle layout
  #[arg(short, long)]
  seed: Option<u64>,
  /// Use the reduced particle count for constrained devices
  #[arg(long, default_value_t = false)]
  mobile: bool,
  /// Run in headless mode (no window)
  #[arg(long, default_value_t = false)]
  headless: bool,
  /// Frames to simulate in headless mode
  #[arg(long, default_value_t = 600)]
  frames: u64,
  #[command(subcommand)]
  command: Option<Commands>,
}

#[derive(Subcommand, Debug)]
enum Commands {
  /// Generate shell completion scripts
  Completions {
    /// The shell to generate the script for
    #[arg(value_enum)]
    shell: Shell,
  },
  /// Validate a contact message and print the request it would send
  Contact {
    #[arg(long)]
    name: String,
    #[arg(long)]
    email: String,
    #[arg(long)]
    message: String,
  },
}

fn main() -> ExitCode {
  env_logger::init();
  let args = Args::parse();
  let options = RunOptions {
    particles: args.particles,
    seed: args.seed,
    mobile: args.mobile,
  };

  match args.command {
    Some(Commands::Completions { shell }) => {
      let mut cmd = Args::command();
      let name = cmd.get_name().to_string();
      generate(shell, &mut cmd, name, &mut io::stdout());
      ExitCode::SUCCESS
    }
    Some(Commands::Contact { name, email, message }) => {
      match ContactForm::new(name, email, message).request_body() {
        Ok(body) => {
          println!("POST {CONTACT_ENDPOINT}");
          println!("{body}");
          ExitCode::SUCCESS
        }
        Err(ContactError::Invalid(issues)) => {
          for issue in issues {
            eprintln!("{issue}");
          }
          ExitCode::FAILURE
        }
        Err(e) => {
          error!("{e}");
          ExitCode::FAILURE
        }
      }
    }
    None if args.headless => {
      let viewport = Viewport::new(1280, 720);
      let headless_options = HeadlessOptions {
        frames: args.frames,
        particles: options.particle_count(viewport.width as f32, &FieldParams::default()),
        seed: options.seed,
        viewport,
        ..Default::default()
      };
      match headless::run(&headless_options) {
        Ok(summary) => {
          info!("headless run finished: {summary:?}");
          ExitCode::SUCCESS
        }
        Err(e) => {
          error!("{e}");
          ExitCode::FAILURE
        }
      }
    }
    None => {
      if let Err(e) = state::run(options) {
        error!("{e}");
        return ExitCode::FAILURE;
      }
      ExitCode::SUCCESS
    }
  }
}
