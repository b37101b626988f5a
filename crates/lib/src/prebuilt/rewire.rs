//! `prebuilt_rewire`: move dependents onto the winning family member.

use tracing::debug;

use crate::pipeline::{VisitContext, VisitError};

use super::linked_prebuilts;
use super::types::{Decision, SELECTION};

pub fn visit(ctx: &mut VisitContext<'_>) -> Result<(), VisitError> {
  let Some(selection) = ctx.provider(SELECTION) else {
    return Ok(());
  };
  let id = ctx.id();

  match selection.decision {
    Decision::UsePrebuilt(prebuilt) => {
      debug!(
        source = %ctx.module(),
        prebuilt = %ctx.graph().module(prebuilt),
        "replacing source with prebuilt"
      );
      ctx.redirect_inbound(prebuilt);
      ctx.set_hidden(id, true);
      ctx.set_replaced_by_prebuilt(true);
      ctx.set_hidden(prebuilt, false);
    }
    Decision::UseSource => {
      for prebuilt in linked_prebuilts(ctx.graph(), id) {
        ctx.set_hidden(prebuilt, true);
      }
    }
  }
  Ok(())
}
