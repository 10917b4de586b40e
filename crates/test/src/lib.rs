use proc_macro::TokenStream;
use quote::quote;
use std::process::{Command, Stdio};
use std::sync::OnceLock;
use syn::{
  parse::{Parse, ParseStream},
  punctuated::Punctuated,
  Ident, ItemFn, Token,
};

/// Set to skip cluster tests without asking `kubectl`.
const SKIP_CLUSTER_ENV: &str = "TASKRUN_STATUS_SKIP_CLUSTER";

static CLUSTER_ANSWERS: OnceLock<bool> = OnceLock::new();

fn cluster_answers() -> bool {
  *CLUSTER_ANSWERS.get_or_init(|| {
    if std::env::var_os(SKIP_CLUSTER_ENV).is_some() {
      return false;
    }

    Command::new("kubectl")
      .args(["version", "--request-timeout=5s"])
      .stdout(Stdio::null())
      .stderr(Stdio::null())
      .status()
      .map_or(false, |status| status.success())
  })
}

#[derive(Default)]
struct Args {
  cluster: bool,
}

impl Parse for Args {
  fn parse(input: ParseStream) -> syn::Result<Self> {
    let mut args = Args::default();

    for ident in Punctuated::<Ident, Token![,]>::parse_terminated(input)? {
      if ident == "cluster" {
        args.cluster = true;
      } else {
        return Err(syn::Error::new(
          ident.span(),
          format!("unknown test option `{}`, expected `cluster`", ident),
        ));
      }
    }

    Ok(args)
  }
}

/// Test attribute for this workspace: installs the logger at trace level and
/// runs `async fn` bodies on tokio.
///
/// `#[taskrun_status_test::test(cluster)]` needs a live API server. When
/// `kubectl` cannot reach one at expansion time, or `TASKRUN_STATUS_SKIP_CLUSTER`
/// is set, the test is emitted as ignored.
#[proc_macro_attribute]
pub fn test(attr: TokenStream, item: TokenStream) -> TokenStream {
  let args = syn::parse_macro_input!(attr as Args);
  let ItemFn {
    attrs,
    vis,
    sig,
    block,
  } = syn::parse_macro_input!(item as ItemFn);

  let ignore = if args.cluster && !cluster_answers() {
    quote! { #[ignore = "no reachable kubernetes cluster"] }
  } else {
    quote! {}
  };

  let runner = if sig.asyncness.is_some() {
    quote! { #[tokio::test] }
  } else {
    quote! { #[test] }
  };

  quote! {
    #ignore
    #runner
    #(#attrs)*
    #vis #sig {
      taskrun_status_logger::init_logger_with_level(log::Level::Trace);

      #block
    }
  }
  .into()
}
